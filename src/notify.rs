//! 上传完成通知模块
//!
//! # 设计思路
//!
//! 通知展示属于外部能力，协调器只负责决定“是否通知、通知什么”。
//! 调用 `Notifier::notify` 前必须先检查 `is_permitted`。
//!
//! 通知 ID 由 URL 哈希确定性地派生，不依赖进程级自增计数器，
//! 并发批次中的多次通知无需共享可变状态。

use std::hash::{DefaultHasher, Hash, Hasher};

/// 通知标题。
pub const UPLOAD_COMPLETE_TITLE: &str = "上传完成";

/// “上传完成”事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadNotification {
    pub id: u32,
    pub title: String,
    pub url: String,
}

impl UploadNotification {
    pub fn for_url(url: &str) -> Self {
        Self {
            id: notification_id_for(url),
            title: UPLOAD_COMPLETE_TITLE.to_string(),
            url: url.to_string(),
        }
    }
}

/// 同一 URL 总是得到同一个 ID，重复通知会覆盖而不是堆叠。
pub fn notification_id_for(url: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

/// 通知能力。
pub trait Notifier: Send + Sync {
    /// 当前是否允许展示通知（对应系统通知权限）。
    fn is_permitted(&self) -> bool;

    fn notify(&self, notification: &UploadNotification);
}

/// 以结构化日志输出通知，适用于命令行环境。
#[derive(Debug, Clone)]
pub struct LogNotifier {
    permitted: bool,
}

impl LogNotifier {
    pub fn new(permitted: bool) -> Self {
        Self { permitted }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Notifier for LogNotifier {
    fn is_permitted(&self) -> bool {
        self.permitted
    }

    fn notify(&self, notification: &UploadNotification) {
        log::info!(
            "🔔 {} - id={} url={}",
            notification.title,
            notification.id,
            notification.url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_id_is_stable_per_url() {
        let a = notification_id_for("https://x/a.png");
        let b = notification_id_for("https://x/a.png");
        let c = notification_id_for("https://x/b.png");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn notification_carries_title_and_url() {
        let notification = UploadNotification::for_url("https://x/y.png");

        assert_eq!(notification.title, UPLOAD_COMPLETE_TITLE);
        assert_eq!(notification.url, "https://x/y.png");
        assert_eq!(notification.id, notification_id_for("https://x/y.png"));
    }
}
