//! # 文件引用解析能力
//!
//! 核心逻辑只通过 `FileResolver` 读取文件，不关心句柄背后是本地路径、
//! 内容提供者还是测试中的内存数据。

use std::io::SeekFrom;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{FileReference, OpenedFile, UploadError};

/// MIME 嗅探读取的最大字节数。
const SNIFF_PROBE_BYTES: usize = 8 * 1024;

/// 把不透明句柄解析为读取流 + 尽力探测的 MIME。
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn open(&self, reference: &FileReference) -> Result<OpenedFile, UploadError>;
}

/// 本地文件系统实现：句柄即路径，MIME 通过 `infer` 按文件头嗅探。
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileResolver;

#[async_trait]
impl FileResolver for LocalFileResolver {
    async fn open(&self, reference: &FileReference) -> Result<OpenedFile, UploadError> {
        let mut file = tokio::fs::File::open(&reference.handle)
            .await
            .map_err(|e| UploadError::FileSystem(format!("无法打开文件 '{}'：{}", reference.handle, e)))?;

        let mut probe = Vec::with_capacity(SNIFF_PROBE_BYTES);
        (&mut file)
            .take(SNIFF_PROBE_BYTES as u64)
            .read_to_end(&mut probe)
            .await
            .map_err(|e| UploadError::FileSystem(format!("读取文件头失败：{}", e)))?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(|e| UploadError::FileSystem(format!("重置读取位置失败：{}", e)))?;

        let mime_type = infer::get(&probe).map(|kind| kind.mime_type().to_string());
        log::debug!(
            "📂 已打开文件 - 句柄: {} 探测 MIME: {:?}",
            reference.handle,
            mime_type
        );

        Ok(OpenedFile {
            reader: Box::new(file),
            mime_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir() -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("linx-share-resolver-test-{nanos}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[tokio::test]
    async fn sniffs_png_and_rewinds_stream() {
        let dir = unique_temp_dir();
        let path = dir.join("pixel");
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        std::fs::write(&path, png_header).expect("write png header");

        let opened = LocalFileResolver
            .open(&FileReference::from_path(&path, None))
            .await
            .expect("open should succeed");
        assert_eq!(opened.mime_type.as_deref(), Some("image/png"));

        let mut reader = opened.reader;
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.expect("read back");
        assert_eq!(content, png_header);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_file_is_filesystem_error() {
        let dir = unique_temp_dir();
        let reference = FileReference::from_path(&dir.join("absent.bin"), None);

        let result = LocalFileResolver.open(&reference).await;
        assert!(matches!(result, Err(UploadError::FileSystem(_))));

        let _ = std::fs::remove_dir_all(dir);
    }
}
