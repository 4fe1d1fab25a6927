//! # 文件名决策模块
//!
//! 规则按顺序执行：
//! 1. 单项批次且显式文件名非空 → 直接使用显式文件名
//! 2. 否则使用文件名提示；提示不含 `.` 时按 MIME 追加扩展名，查不到则保持原样
//! 3. 发生过 JPEG 转码 → 把扩展名改写为 `.jpg`
//!
//! 多项批次共用一个显式文件名没有意义，所以显式文件名只在单项批次中生效。

/// 引用没有文件名提示时使用的名称。
const DEFAULT_NAME_HINT: &str = "file";

/// 决定最终上传文件名。
pub fn resolve_filename(
    name_hint: Option<&str>,
    mime_type: Option<&str>,
    explicit: &str,
    batch_size: usize,
    was_converted: bool,
) -> String {
    let resolved = if batch_size == 1 && !explicit.is_empty() {
        explicit.to_string()
    } else {
        derive_from_hint(name_hint.unwrap_or(DEFAULT_NAME_HINT), mime_type)
    };

    if was_converted {
        with_jpeg_extension(&resolved)
    } else {
        resolved
    }
}

fn derive_from_hint(hint: &str, mime_type: Option<&str>) -> String {
    if hint.contains('.') {
        return hint.to_string();
    }

    match mime_type.and_then(extension_for_mime_type) {
        Some(ext) => format!("{hint}.{ext}"),
        None => hint.to_string(),
    }
}

/// 把扩展名改写为 `.jpg`。
///
/// 位于开头的 `.`（隐藏文件）不视为扩展名分隔符。
///
/// # 示例
/// ```rust
/// use linx_share::upload::with_jpeg_extension;
///
/// assert_eq!(with_jpeg_extension(""), "upload.jpg");
/// assert_eq!(with_jpeg_extension("photo.heic"), "photo.jpg");
/// assert_eq!(with_jpeg_extension(".hidden"), ".hidden.jpg");
/// ```
pub fn with_jpeg_extension(name: &str) -> String {
    if name.is_empty() {
        return "upload.jpg".to_string();
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.jpg", &name[..dot]),
        _ => format!("{name}.jpg"),
    }
}

/// MIME → 扩展名。忽略大小写与 `;` 之后的参数。
pub fn extension_for_mime_type(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default();

    match essence.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" | "image/x-ms-bmp" => Some("bmp"),
        "image/heic" => Some("heic"),
        "image/heif" => Some("heif"),
        "image/heic-sequence" => Some("heics"),
        "image/heif-sequence" => Some("heifs"),
        "image/avif" => Some("avif"),
        "image/tiff" => Some("tiff"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "video/3gpp" => Some("3gp"),
        "video/x-matroska" => Some("mkv"),
        "audio/mpeg" => Some("mp3"),
        "audio/mp4" | "audio/x-m4a" => Some("m4a"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/wav" | "audio/x-wav" => Some("wav"),
        "audio/aac" => Some("aac"),
        "application/pdf" => Some("pdf"),
        "application/zip" => Some("zip"),
        "application/gzip" | "application/x-gzip" => Some("gz"),
        "application/x-tar" => Some("tar"),
        "application/x-7z-compressed" => Some("7z"),
        "application/json" => Some("json"),
        "application/xml" | "text/xml" => Some("xml"),
        "application/vnd.android.package-archive" => Some("apk"),
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "text/css" => Some("css"),
        "text/csv" => Some("csv"),
        "text/markdown" => Some("md"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn explicit_filename_wins_for_single_item() {
        let name = resolve_filename(Some("IMG_1"), Some("image/png"), "holiday.png", 1, false);
        assert_eq!(name, "holiday.png");
    }

    #[test]
    fn explicit_filename_is_ignored_for_batches() {
        let name = resolve_filename(Some("IMG_1"), Some("image/png"), "holiday.png", 3, false);
        assert_eq!(name, "IMG_1.png");
    }

    #[test]
    fn hint_with_dot_is_kept() {
        let name = resolve_filename(Some("report.final"), Some("application/pdf"), "", 1, false);
        assert_eq!(name, "report.final");
    }

    #[test]
    fn unknown_mime_keeps_hint() {
        let name = resolve_filename(Some("blob"), Some("application/x-unknown"), "", 2, false);
        assert_eq!(name, "blob");
    }

    #[test]
    fn missing_hint_uses_default_name() {
        let name = resolve_filename(None, Some("text/plain"), "", 2, false);
        assert_eq!(name, "file.txt");
    }

    #[test]
    fn conversion_rewrites_extension_on_both_paths() {
        assert_eq!(resolve_filename(Some("IMG_2.HEIC"), Some("image/heic"), "", 2, true), "IMG_2.jpg");
        assert_eq!(resolve_filename(Some("IMG_2.HEIC"), None, "mine.heic", 1, true), "mine.jpg");
        assert_eq!(resolve_filename(Some("IMG_3"), Some("image/heif"), "", 2, true), "IMG_3.jpg");
    }

    #[test]
    fn jpeg_extension_edge_cases() {
        assert_eq!(with_jpeg_extension(""), "upload.jpg");
        assert_eq!(with_jpeg_extension("photo"), "photo.jpg");
        assert_eq!(with_jpeg_extension("photo.heic"), "photo.jpg");
        assert_eq!(with_jpeg_extension(".hidden"), ".hidden.jpg");
        assert_eq!(with_jpeg_extension("archive.tar.heic"), "archive.tar.jpg");
    }

    #[test]
    fn maps_mime_to_extension() {
        assert_eq!(extension_for_mime_type("image/png"), Some("png"));
        assert_eq!(extension_for_mime_type("IMAGE/JPEG"), Some("jpg"));
        assert_eq!(extension_for_mime_type("text/plain; charset=utf-8"), Some("txt"));
        assert_eq!(extension_for_mime_type("application/x-unknown"), None);
    }

    proptest! {
        #[test]
        fn explicit_name_is_returned_unchanged(
            hint in "[a-zA-Z0-9_]{0,12}",
            explicit in "[a-zA-Z0-9_.-]{1,24}",
        ) {
            let name = resolve_filename(Some(&hint), Some("image/png"), &explicit, 1, false);
            prop_assert_eq!(name, explicit);
        }

        #[test]
        fn dotless_hint_gets_mime_extension(
            hint in "[a-zA-Z0-9_-]{0,16}",
            batch_size in 1usize..8,
        ) {
            let name = resolve_filename(Some(&hint), Some("video/mp4"), "", batch_size, false);
            prop_assert_eq!(name, format!("{hint}.mp4"));
        }

        #[test]
        fn converted_names_always_end_in_jpg(name in "[a-zA-Z0-9_.]{0,20}") {
            prop_assert!(with_jpeg_extension(&name).ends_with(".jpg"));
        }
    }
}
