//! # HEIC/HEIF → JPEG 规范化模块
//!
//! ## 设计思路
//!
//! 部分服务端与浏览器无法展示 HEIC，开启开关后在上传前统一转为 JPEG。
//! 转码失败不是错误：调用方继续上传原始字节。
//!
//! ## 实现思路
//!
//! 1. 按 MIME 或文件名后缀判定是否需要转码
//! 2. HEIF 容器（按文件头识别）交给外部 `ffmpeg` 解出第一帧 PNG；其他格式直接交给 `image`
//! 3. 读取 header 尺寸，按像素上限快速拒绝
//! 4. 完整解码（必须整块缓冲，无法流式）
//! 5. 去掉 alpha 通道后按固定质量编码 JPEG
//!
//! `image` 没有 HEIF 解码器，`ffmpeg` 不存在或解码失败时同样走“上传原始字节”的回退。
//! 解码与编码是同步 CPU 任务，由调用方放到阻塞线程池执行。

use std::io::{Cursor, Write};
use std::path::Path;
use std::process::Command;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use tempfile::NamedTempFile;

use super::{UploadError, UploaderConfig};

const HEIF_MIME_TYPES: [&str; 4] = [
    "image/heic",
    "image/heif",
    "image/heic-sequence",
    "image/heif-sequence",
];

/// 判断是否需要转码为 JPEG。
///
/// 开关关闭时恒为 false；否则 MIME（忽略大小写）属于 HEIC/HEIF 族，
/// 或文件名提示以 `.heic` / `.heif` 结尾即需要转码。
pub fn should_convert(name_hint: Option<&str>, mime_type: Option<&str>, enabled: bool) -> bool {
    if !enabled {
        return false;
    }

    if let Some(mime) = mime_type {
        let mime = mime.trim().to_ascii_lowercase();
        if HEIF_MIME_TYPES.contains(&mime.as_str()) {
            return true;
        }
    }

    let Some(hint) = name_hint else {
        return false;
    };
    let hint = hint.to_ascii_lowercase();
    hint.ends_with(".heic") || hint.ends_with(".heif")
}

/// 文件头是否为 HEIF 容器（`ftyp` + heic/heix/mif1 等品牌）。
pub fn is_heif_container(bytes: &[u8]) -> bool {
    infer::get(bytes).is_some_and(|kind| HEIF_MIME_TYPES.contains(&kind.mime_type()))
}

/// 将整张图片解码并重新编码为 JPEG。
///
/// # 示例
/// ```rust,ignore
/// let jpeg = transcode_to_jpeg(&bytes, &UploaderConfig::default())?;
/// assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
/// ```
pub fn transcode_to_jpeg(bytes: &[u8], config: &UploaderConfig) -> Result<Vec<u8>, UploadError> {
    let bridged;
    let source = if is_heif_container(bytes) {
        bridged = decode_heif_to_png(bytes, &config.heif_decoder)?;
        bridged.as_slice()
    } else {
        bytes
    };

    let (width, height) = inspect_dimensions(source)?;
    validate_pixel_limit(width, height, config.max_decoded_pixels)?;

    let decoded = image::load_from_memory(source)
        .map_err(|e| UploadError::Decode(format!("图片解码失败：{}", e)))?;

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut output = Vec::with_capacity(bytes.len());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut output, config.jpeg_quality))
        .map_err(|e| UploadError::Decode(format!("JPEG 编码失败：{}", e)))?;

    log::info!(
        "🖼️ 已转码为 JPEG - 尺寸: {}x{} 输入: {}KB 输出: {}KB",
        width,
        height,
        bytes.len() / 1024,
        output.len() / 1024
    );

    Ok(output)
}

/// 通过外部解码器把 HEIF 的主图像解为 PNG。
///
/// 输入与输出都经由临时文件传递，函数返回时自动清理。
fn decode_heif_to_png(bytes: &[u8], decoder: &Path) -> Result<Vec<u8>, UploadError> {
    let temp_err = |e: std::io::Error| UploadError::Decode(format!("创建临时文件失败：{}", e));

    let mut input = tempfile::Builder::new()
        .suffix(".heic")
        .tempfile()
        .map_err(temp_err)?;
    input.write_all(bytes).map_err(temp_err)?;
    let input_path = input.into_temp_path();
    let output_file = NamedTempFile::with_suffix(".png").map_err(temp_err)?;

    let output = Command::new(decoder)
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(input_path.as_os_str())
        .arg("-frames:v")
        .arg("1")
        .arg(output_file.path())
        .output()
        .map_err(|e| UploadError::Decode(format!("无法启动 HEIF 解码器 '{}'：{}", decoder.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(UploadError::Decode(format!(
            "HEIF 解码器退出异常（{}）：{}",
            output.status,
            stderr.trim()
        )));
    }

    let png = std::fs::read(output_file.path())
        .map_err(|e| UploadError::Decode(format!("读取解码结果失败：{}", e)))?;
    if png.is_empty() {
        return Err(UploadError::Decode("HEIF 解码器没有产生输出".to_string()));
    }

    log::debug!("🧩 HEIF 已解为 PNG - 输入: {}KB 输出: {}KB", bytes.len() / 1024, png.len() / 1024);
    Ok(png)
}

/// 仅读取图片头中的宽高，用于在完整解码前做像素限制检查。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), UploadError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| UploadError::Decode(format!("无法识别图片格式：{}", e)))?
        .into_dimensions()
        .map_err(|e| UploadError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limit(width: u32, height: u32, max_pixels: u64) -> Result<(), UploadError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| UploadError::Decode("图片像素数溢出".to_string()))?;

    if pixels > max_pixels {
        return Err(UploadError::Decode(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, max_pixels
        )));
    }

    Ok(())
}

/// 在阻塞线程中转码；任何失败都返回 `None`，由调用方回退到原始字节。
pub(crate) async fn normalize(bytes: bytes::Bytes, config: UploaderConfig) -> Option<Vec<u8>> {
    let outcome = tokio::task::spawn_blocking(move || transcode_to_jpeg(&bytes, &config)).await;

    match outcome {
        Ok(Ok(jpeg)) => Some(jpeg),
        Ok(Err(err)) => {
            log::warn!("⚠️ HEIC/HEIF 转 JPEG 失败，改为上传原始文件：{}", err);
            None
        }
        Err(err) => {
            log::warn!("⚠️ 转码线程执行失败，改为上传原始文件：{}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use proptest::prelude::*;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 200])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn mime_match_is_case_insensitive() {
        assert!(should_convert(None, Some("image/HEIC"), true));
        assert!(should_convert(None, Some("image/heif-sequence"), true));
        assert!(!should_convert(None, Some("image/png"), true));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(should_convert(Some("IMG_0001.HEIC"), None, true));
        assert!(should_convert(Some("scan.heif"), Some("application/octet-stream"), true));
        assert!(!should_convert(Some("heic.png"), None, true));
    }

    #[test]
    fn transcodes_png_with_alpha_to_jpeg() {
        let png = create_png_bytes(64, 48);

        let jpeg = transcode_to_jpeg(&png, &UploaderConfig::default()).expect("transcode should succeed");

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).expect("output should decode");
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let result = transcode_to_jpeg(b"definitely not an image", &UploaderConfig::default());
        assert!(matches!(result, Err(UploadError::Decode(_))));
    }

    #[test]
    fn rejects_images_over_pixel_limit() {
        let png = create_png_bytes(32, 32);
        let config = UploaderConfig {
            max_decoded_pixels: 100,
            ..UploaderConfig::default()
        };
        let result = transcode_to_jpeg(&png, &config);
        assert!(matches!(result, Err(UploadError::Decode(_))));
    }

    fn heif_header() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(b"ftypheic");
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"mif1heic");
        bytes
    }

    #[test]
    fn recognizes_heif_container_by_header() {
        assert!(is_heif_container(&heif_header()));
        assert!(!is_heif_container(&create_png_bytes(2, 2)));
        assert!(!is_heif_container(b"ftyp"));
    }

    #[test]
    fn heif_without_decoder_is_decode_error() {
        let config = UploaderConfig {
            heif_decoder: "/nonexistent/linx-share-ffmpeg".into(),
            ..UploaderConfig::default()
        };

        let result = transcode_to_jpeg(&heif_header(), &config);
        assert!(matches!(result, Err(UploadError::Decode(_))));
    }

    /// 用 shell 脚本替身模拟 ffmpeg：把预先准备的 PNG 复制到最后一个参数（输出路径）。
    #[cfg(unix)]
    #[test]
    fn heif_is_bridged_through_external_decoder() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("create temp dir");
        let frame = dir.path().join("frame.png");
        std::fs::write(&frame, create_png_bytes(40, 30)).expect("write frame");

        let write_script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            path
        };

        let decoder = write_script(
            "fake-ffmpeg",
            &format!("for last; do :; done\ncp \"{}\" \"$last\"", frame.display()),
        );
        let config = UploaderConfig {
            heif_decoder: decoder,
            ..UploaderConfig::default()
        };
        let jpeg = transcode_to_jpeg(&heif_header(), &config).expect("bridged transcode");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).expect("output should decode");
        assert_eq!((decoded.width(), decoded.height()), (40, 30));

        let failing = write_script("broken-ffmpeg", "echo 'Invalid data found' >&2\nexit 1");
        let config = UploaderConfig {
            heif_decoder: failing,
            ..UploaderConfig::default()
        };
        assert!(matches!(
            transcode_to_jpeg(&heif_header(), &config),
            Err(UploadError::Decode(_))
        ));
    }

    /// 需要本机安装 ffmpeg，并通过 `LINX_SHARE_HEIC_FIXTURE` 指向一张真实的 HEIC 照片。
    #[test]
    fn real_heic_is_transcoded_when_ffmpeg_is_available() {
        let Ok(fixture) = std::env::var("LINX_SHARE_HEIC_FIXTURE") else {
            return;
        };
        let ffmpeg_ready = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .is_ok_and(|output| output.status.success());
        if !ffmpeg_ready {
            return;
        }

        let heic = std::fs::read(&fixture).expect("read heic fixture");
        assert!(is_heif_container(&heic));
        let jpeg = transcode_to_jpeg(&heic, &UploaderConfig::default()).expect("transcode real heic");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn normalize_returns_none_on_failure() {
        let outcome = normalize(bytes::Bytes::from_static(b"garbage"), UploaderConfig::default()).await;
        assert!(outcome.is_none());
    }

    proptest! {
        #[test]
        fn disabled_flag_never_converts(
            hint in proptest::option::of("[a-zA-Z0-9_]{0,8}\\.(heic|HEIF|png|jpg)"),
            mime in proptest::option::of(prop_oneof![
                Just("image/heic".to_string()),
                Just("IMAGE/HEIF".to_string()),
                Just("image/png".to_string()),
            ]),
        ) {
            prop_assert!(!should_convert(hint.as_deref(), mime.as_deref(), false));
        }
    }
}
