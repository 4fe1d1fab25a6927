//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载单个文件上传链路中的所有错误来源。
//! 协调器不会把这些细节透传给调用方：每一项的错误只写日志，随后折叠为“该项失败”。

/// 单项上传统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("服务端状态异常：HTTP {0}")]
    Status(u16),

    #[error("请求构造失败：{0}")]
    InvalidRequest(String),

    #[error("响应格式错误：{0}")]
    InvalidResponse(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("上传批次为空")]
    EmptyBatch,
}
