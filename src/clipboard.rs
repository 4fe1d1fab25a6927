//! 剪贴板写入模块
//!
//! # 设计思路
//!
//! 协调器只依赖 `ClipboardSink` 能力，不直接接触操作系统剪贴板，测试中可替换为记录型实现。
//!
//! # 实现思路
//!
//! - `SystemClipboard` 通过 `arboard` 写入文本。
//! - 写入在阻塞线程中执行，避免阻塞 async 运行时。
//! - 其他应用占用剪贴板时写入可能短暂失败，按指数退避做有限重试。

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;

/// 接收一段文本并放入系统剪贴板。
#[async_trait]
pub trait ClipboardSink: Send + Sync {
    async fn copy_text(&self, text: &str) -> Result<(), AppError>;
}

/// 基于 `arboard` 的系统剪贴板。
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    /// 最大尝试次数（至少 1 次）。
    pub retries: u32,
    /// 首次重试前的等待（毫秒）。
    pub retry_delay_ms: u64,
    /// 单次退避等待上限（毫秒）。
    pub retry_max_delay_ms: u64,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 100,
            retry_max_delay_ms: 900,
        }
    }
}

impl SystemClipboard {
    fn write_text_with_retry(&self, text: &str) -> Result<(), AppError> {
        let attempts = self.retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let wait_ms = compute_backoff_delay(self.retry_delay_ms.max(1), attempt - 1, self.retry_max_delay_ms);
                log::debug!("🔁 剪贴板写入第 {} 次重试，等待 {}ms", attempt, wait_ms);
                std::thread::sleep(Duration::from_millis(wait_ms));
            }

            let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_string()));
            match result {
                Ok(()) => {
                    log::info!("📋 已复制到剪贴板（第 {} 次尝试）", attempt);
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("⚠️ 剪贴板写入失败（第 {}/{} 次）：{}", attempt, attempts, err);
                    last_error = err.to_string();
                }
            }
        }

        Err(AppError::Clipboard(last_error))
    }
}

#[async_trait]
impl ClipboardSink for SystemClipboard {
    async fn copy_text(&self, text: &str) -> Result<(), AppError> {
        let writer = self.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || writer.write_text_with_retry(&text))
            .await
            .map_err(|e| AppError::Clipboard(format!("线程执行失败：{}", e)))?
    }
}

/// 指数退避：`base * 2^(attempt-1)`，不超过 `max_delay_ms`。
fn compute_backoff_delay(base_delay_ms: u64, attempt: u32, max_delay_ms: u64) -> u64 {
    let exp = base_delay_ms.saturating_mul(1_u64 << attempt.saturating_sub(1).min(8));
    exp.min(max_delay_ms.max(base_delay_ms))
}
