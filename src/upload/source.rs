//! # 数据源与中间模型
//!
//! 将“外部输入”与“单次调用的结果”解耦：
//! - `FileReference` 表示调用方提供的不透明文件句柄
//! - `UploadBatch` 表示一次分享的全部文件（至少一项）
//! - `OpenedFile` 表示解析后的读取流与探测到的 MIME
//! - `BatchResult` 表示对调用方唯一可见的结果

use std::path::Path;

use tokio::io::AsyncRead;

use super::UploadError;

/// 文件引用：不透明句柄 + 可选的声明 MIME 与文件名提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// 交给 `FileResolver` 解释的句柄（本地实现中为文件路径）。
    pub handle: String,
    /// 调用方声明的 MIME（可能缺失或不准确）。
    pub mime_type: Option<String>,
    /// 路径最后一段，用作文件名提示。
    pub name_hint: Option<String>,
}

impl FileReference {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            mime_type: None,
            name_hint: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_name_hint(mut self, name_hint: impl Into<String>) -> Self {
        self.name_hint = Some(name_hint.into());
        self
    }

    /// 从本地路径构造引用，文件名提示取路径最后一段。
    pub fn from_path(path: &Path, declared_mime: Option<&str>) -> Self {
        Self {
            handle: path.to_string_lossy().to_string(),
            mime_type: declared_mime.map(str::to_string),
            name_hint: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
        }
    }
}

/// 一次上传调用的全部文件，顺序保留但不影响执行。
#[derive(Debug, Clone)]
pub struct UploadBatch {
    items: Vec<FileReference>,
}

impl UploadBatch {
    /// 构造批次；空列表被拒绝。
    pub fn new(items: Vec<FileReference>) -> Result<Self, UploadError> {
        if items.is_empty() {
            return Err(UploadError::EmptyBatch);
        }
        Ok(Self { items })
    }

    pub fn single(reference: FileReference) -> Self {
        Self {
            items: vec![reference],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn into_items(self) -> Vec<FileReference> {
        self.items
    }
}

/// 解析后的文件：读取流 + 尽力探测的 MIME。
pub struct OpenedFile {
    pub reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
    pub mime_type: Option<String>,
}

impl std::fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedFile")
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// 批次结果。
///
/// 只有当每一项都拿到 URL 时才是 `Success`；任何一项失败都会让整批降级为 `Failure`，
/// 已成功上传的文件不会被回报，也不会被删除。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResult {
    /// 单项批次携带 URL；多项批次不携带。
    Success { url: Option<String> },
    /// 固定的用户可见提示，不含服务端细节。
    Failure { message: String },
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
