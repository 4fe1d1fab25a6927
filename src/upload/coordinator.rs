//! # 上传协调器
//!
//! ## 设计思路
//!
//! 协调器负责一次批次上传的完整生命周期：
//! 1. 只解析一次 endpoint 与认证头，整批共享
//! 2. 每个文件启动一个任务，信号量限制同时进行的数量
//! 3. 等待全部任务结束（不会因为某一项失败而提前取消其他项）
//! 4. 全部成功才算成功；任何一项失败都让整批失败
//!
//! 成功后的副作用：单项批次复制 URL 到剪贴板并按设置通知；多项批次只按设置逐条通知。
//! 失败时只返回固定提示，已成功的 URL 不会回报，服务端上已存在的文件也不会被删除。
//!
//! ## 状态机
//!
//! `Idle → Running → {Succeeded, Failed}`，一次运行即终态，新批次总是新的 `UploadRun`。
//! 状态通过 `watch` 通道发布：调用方在 `execute` 之前 `subscribe`，即可在运行中和结束后观察阶段。

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, watch};

use super::{
    BatchResult, Endpoint, FileReference, UploadBatch, UploadConfiguration, Uploader, parse_endpoint,
    redact_url_for_log,
};
use crate::clipboard::ClipboardSink;
use crate::notify::{Notifier, UploadNotification};

/// 批次失败时对用户展示的固定提示。
pub const UPLOAD_FAILED_MESSAGE: &str = "上传失败";

/// 一次运行所处的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// 成功后的通知开关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationPrefs {
    pub single: bool,
    pub multi: bool,
}

/// 上传协调器。
///
/// 持有共享的上传执行器与副作用能力，可被多次调用；每次调用对应一个独立的 `UploadRun`。
pub struct UploadCoordinator {
    uploader: Arc<Uploader>,
    clipboard: Arc<dyn ClipboardSink>,
    notifier: Arc<dyn Notifier>,
}

impl UploadCoordinator {
    pub fn new(
        uploader: Uploader,
        clipboard: Arc<dyn ClipboardSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            uploader: Arc::new(uploader),
            clipboard,
            notifier,
        }
    }

    /// 为一个批次创建处于 `Idle` 的运行。
    pub fn begin(
        &self,
        batch: UploadBatch,
        config: UploadConfiguration,
        prefs: NotificationPrefs,
    ) -> UploadRun<'_> {
        let (state, _) = watch::channel(RunState::Idle);
        UploadRun {
            coordinator: self,
            batch,
            config,
            prefs,
            state,
        }
    }

    /// 执行整批上传并返回唯一结果，从不返回错误。
    pub async fn run(
        &self,
        batch: UploadBatch,
        config: UploadConfiguration,
        prefs: NotificationPrefs,
    ) -> BatchResult {
        self.begin(batch, config, prefs).execute().await
    }

    /// 扇出全部上传并按原顺序收集结果。任务 panic 视为该项失败。
    async fn upload_all(
        &self,
        items: Vec<FileReference>,
        config: Arc<UploadConfiguration>,
        endpoint: Arc<Endpoint>,
    ) -> Vec<Option<String>> {
        let batch_size = items.len();
        let semaphore = Arc::new(Semaphore::new(
            self.uploader.config().max_concurrent_uploads.max(1),
        ));

        let mut handles = Vec::with_capacity(batch_size);
        for reference in items {
            let uploader = Arc::clone(&self.uploader);
            let config = Arc::clone(&config);
            let endpoint = Arc::clone(&endpoint);
            let semaphore = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                uploader
                    .upload(&reference, &config, &endpoint, batch_size)
                    .await
            }));
        }

        let mut outcomes = Vec::with_capacity(batch_size);
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    log::warn!("⚠️ 第 {} 项上传任务异常终止：{}", index + 1, err);
                    outcomes.push(None);
                }
            }
        }
        outcomes
    }

    async fn on_single_success(&self, url: &str, prefs: NotificationPrefs) {
        // 上传已在服务端生效，复制失败只记录日志
        if let Err(err) = self.clipboard.copy_text(url).await {
            log::warn!("⚠️ 复制 URL 到剪贴板失败：{}", err);
        }

        if prefs.single {
            self.dispatch_notification(url);
        }
    }

    fn on_multi_success(&self, urls: &[String], prefs: NotificationPrefs) {
        if prefs.multi {
            for url in urls {
                self.dispatch_notification(url);
            }
        }
    }

    fn dispatch_notification(&self, url: &str) {
        if !self.notifier.is_permitted() {
            log::debug!("🔕 无通知权限，跳过通知");
            return;
        }
        self.notifier.notify(&UploadNotification::for_url(url));
    }
}

/// 单次批次运行，`execute` 消耗自身，因此不可重入、不可恢复。
pub struct UploadRun<'a> {
    coordinator: &'a UploadCoordinator,
    batch: UploadBatch,
    config: UploadConfiguration,
    prefs: NotificationPrefs,
    state: watch::Sender<RunState>,
}

impl UploadRun<'_> {
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// 订阅阶段变化；`execute` 消耗运行后，接收端仍能读到最终阶段。
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub async fn execute(self) -> BatchResult {
        let UploadRun {
            coordinator,
            batch,
            config,
            prefs,
            state,
        } = self;
        advance(&state, RunState::Running);
        let started = Instant::now();

        let endpoint = Arc::new(parse_endpoint(&config.endpoint_url));
        let batch_size = batch.len();
        log::info!(
            "📤 开始上传批次 - 文件数: {} 目标: {} 随机文件名: {} 认证: {}",
            batch_size,
            redact_url_for_log(&endpoint.upload_url()),
            config.randomize_filename,
            endpoint.authorization.is_some()
        );

        let outcomes = coordinator
            .upload_all(batch.into_items(), Arc::new(config), endpoint)
            .await;
        let failed = outcomes.iter().filter(|outcome| outcome.is_none()).count();

        // 全有或全无：任何一项缺失 URL 都让整批失败
        let Some(urls) = outcomes.into_iter().collect::<Option<Vec<String>>>() else {
            advance(&state, RunState::Failed);
            log::warn!(
                "❌ 批次上传失败 - 失败项: {}/{} 耗时: {}ms（已成功的文件不会回报）",
                failed,
                batch_size,
                started.elapsed().as_millis()
            );
            return BatchResult::Failure {
                message: UPLOAD_FAILED_MESSAGE.to_string(),
            };
        };

        let result = match urls.as_slice() {
            [url] => {
                coordinator.on_single_success(url, prefs).await;
                BatchResult::Success {
                    url: Some(url.clone()),
                }
            }
            _ => {
                coordinator.on_multi_success(&urls, prefs);
                BatchResult::Success { url: None }
            }
        };

        advance(&state, RunState::Succeeded);
        log::info!(
            "✅ 批次上传完成 - 文件数: {} 耗时: {}ms",
            batch_size,
            started.elapsed().as_millis()
        );
        result
    }
}

fn advance(state: &watch::Sender<RunState>, next: RunState) {
    let previous = state.send_replace(next);
    log::debug!("🔄 上传运行状态：{:?} -> {:?}", previous, next);
}
