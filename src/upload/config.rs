//! # 配置模块
//!
//! ## 设计思路
//!
//! 区分两类配置：
//! - `UploadConfiguration`：单次上传的业务参数，由设置快照 + 本次覆盖项构造，运行期间不可变。
//! - `UploaderConfig`：与业务无关的调优参数（并发上限、连接超时、解码像素上限、HEIF 解码器）。
//!
//! ## 实现思路
//!
//! - 设置只在调用开始时读取一次，下游逻辑只依赖这份快照。
//! - `UploadOverrides` 对应上传界面上可临时修改的字段，`None` 表示沿用设置。

use std::path::PathBuf;

use crate::settings::SettingsSnapshot;

/// 单次上传的业务参数（每次调用重新构造）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfiguration {
    /// 服务基础地址，可能内嵌 `user:pass@`。
    pub endpoint_url: String,
    pub api_key: String,
    pub delete_key: String,
    /// 过期时间（秒），0 表示永不过期。
    pub expiration: u64,
    /// 为 true 时走 PUT + `Linx-Randomize: yes`，文件名由服务端生成。
    pub randomize_filename: bool,
    pub convert_heic_to_jpeg: bool,
    /// 显式文件名，仅在不随机化且批次只有一项时生效。
    pub filename: String,
}

/// 上传界面上的临时覆盖项。
#[derive(Debug, Clone, Default)]
pub struct UploadOverrides {
    pub delete_key: Option<String>,
    pub expiration: Option<u64>,
    pub randomize_filename: Option<bool>,
    pub convert_heic_to_jpeg: Option<bool>,
    pub filename: Option<String>,
}

impl UploadConfiguration {
    /// 由设置快照与本次覆盖项构造上传参数。
    ///
    /// # 示例
    /// ```rust
    /// use linx_share::settings::SettingsSnapshot;
    /// use linx_share::upload::{UploadConfiguration, UploadOverrides};
    ///
    /// let overrides = UploadOverrides { expiration: Some(3600), ..Default::default() };
    /// let config = UploadConfiguration::from_settings(&SettingsSnapshot::default(), overrides);
    /// assert_eq!(config.expiration, 3600);
    /// ```
    pub fn from_settings(settings: &SettingsSnapshot, overrides: UploadOverrides) -> Self {
        Self {
            endpoint_url: settings.endpoint_url.clone(),
            api_key: settings.api_key.clone(),
            delete_key: overrides
                .delete_key
                .unwrap_or_else(|| settings.delete_key.clone()),
            expiration: overrides.expiration.unwrap_or(settings.expiration),
            randomize_filename: overrides
                .randomize_filename
                .unwrap_or(settings.randomize_filename),
            convert_heic_to_jpeg: overrides
                .convert_heic_to_jpeg
                .unwrap_or(settings.convert_heic_to_jpeg),
            filename: overrides.filename.unwrap_or_default(),
        }
    }
}

/// 上传执行器调优参数。
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// 同一批次内同时进行的上传数上限（至少为 1）。
    pub max_concurrent_uploads: usize,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 转码前允许的像素上限（`width * height`），超出视为无法转码。
    ///
    /// 默认 1 亿像素：覆盖 48MP / 50MP 手机照片，同时限制单张 RGBA 解码内存在 400MB 以内。
    pub max_decoded_pixels: u64,
    /// JPEG 编码质量。
    pub jpeg_quality: u8,
    /// 把 HEIF 解为 PNG 的外部程序（ffmpeg 兼容命令行）。
    pub heif_decoder: PathBuf,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 4,
            connect_timeout: 10,
            max_decoded_pixels: 100_000_000,
            jpeg_quality: 95,
            heif_decoder: PathBuf::from("ffmpeg"),
        }
    }
}

impl UploaderConfig {
    /// 以默认值为基础，应用设置中的并发上限。
    pub fn from_settings(settings: &SettingsSnapshot) -> Self {
        Self {
            max_concurrent_uploads: settings.max_concurrent_uploads.max(1),
            ..Self::default()
        }
    }
}
