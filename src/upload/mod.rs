//! # 上传模块（upload）
//!
//! ## 设计思路
//!
//! 将“地址解析 → 打开文件 → 可选 HEIC 转码 → 文件名决策 → 发送请求 → 批次汇总”
//! 按职责拆分为多个子模块，协调器只负责编排，不关心单个请求的细节。
//!
//! - `endpoint`：拆分基础地址与 URL 中内嵌的 Basic 凭据
//! - `filename`：多项/单项批次的文件名策略与 MIME → 扩展名映射
//! - `normalize`：HEIC/HEIF → JPEG 判定与转码（HEIF 经 ffmpeg 解码，失败即回退原始字节）
//! - `resolver`：文件引用解析能力（读取流 + MIME 探测）
//! - `uploader`：构建并执行单个 PUT / multipart POST 请求
//! - `coordinator`：并发扇出、全有或全无汇总、剪贴板与通知副作用
//! - `config/error/source`：配置、错误、数据模型
//!
//! ## 调用链
//!
//! ```text
//! main.rs（命令行参数 → 设置快照 → 批次）
//!    ↓
//! coordinator.rs（解析一次 endpoint，按项 spawn 任务，Semaphore 限流）
//!    ├─ uploader.rs（打开文件 → normalize.rs → filename.rs → HTTP）
//!    └─ 汇总：全部成功才触发 ClipboardSink / Notifier
//!    ↓
//! BatchResult（Success / Failure，不向外抛错）
//! ```

mod config;
mod coordinator;
mod endpoint;
mod error;
mod filename;
mod normalize;
mod resolver;
mod source;
mod uploader;

pub use config::{UploadConfiguration, UploadOverrides, UploaderConfig};
pub use coordinator::{NotificationPrefs, RunState, UPLOAD_FAILED_MESSAGE, UploadCoordinator, UploadRun};
pub use endpoint::{Endpoint, parse_endpoint, redact_url_for_log};
pub use error::UploadError;
pub use filename::{extension_for_mime_type, resolve_filename, with_jpeg_extension};
pub use normalize::{is_heif_container, should_convert, transcode_to_jpeg};
pub use resolver::{FileResolver, LocalFileResolver};
pub use source::{BatchResult, FileReference, OpenedFile, UploadBatch};
pub use uploader::Uploader;
