//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级统一的 `AppError` 枚举，覆盖设置读写、剪贴板、文件系统与命令行输入。
//! 单个文件上传链路的错误由 `upload::UploadError` 承载，在协调器边界被折叠为
//! “该项失败”，只在需要时经 `From` 上转为 `AppError`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `UploadError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。

use crate::upload::UploadError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 上传链路错误（解析 / 读取 / 网络）
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件不可用或内容非法
    #[error("设置错误: {0}")]
    Settings(String),

    /// 命令行参数不合法
    #[error("参数错误: {0}")]
    InvalidInput(String),
}
