//! # linx-share — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与能力装配。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use linx_share::clipboard::{ClipboardSink, SystemClipboard};
use linx_share::error::AppError;
use linx_share::notify::LogNotifier;
use linx_share::settings::{JsonSettingsStore, SettingsPatch, SettingsProvider};
use linx_share::upload::{
    BatchResult, FileReference, LocalFileResolver, UPLOAD_FAILED_MESSAGE, UploadBatch,
    UploadConfiguration, UploadCoordinator, UploadOverrides, Uploader, UploaderConfig,
};

#[derive(Debug, Parser)]
#[command(name = "linx-share", version, about = "把文件上传到自建 linx 服务并复制链接")]
struct Cli {
    /// 设置文件路径
    #[arg(long, global = true, default_value = "linx-share.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 上传一个或多个文件
    Upload(UploadArgs),
    /// 查看或修改设置
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// 把 URL 复制到剪贴板
    Copy { url: String },
}

#[derive(Debug, Args)]
struct UploadArgs {
    /// 本次上传使用的删除密钥
    #[arg(long)]
    delete_key: Option<String>,
    /// 过期时间（秒），0 表示永不过期
    #[arg(long = "expiry")]
    expiration: Option<u64>,
    /// 由服务端生成随机文件名
    #[arg(long)]
    randomize: Option<bool>,
    /// HEIC/HEIF 转为 JPEG 后再上传
    #[arg(long)]
    convert_heic: Option<bool>,
    /// 显式文件名（仅单个文件且不随机化时生效）
    #[arg(long)]
    filename: Option<String>,
    /// 声明的 MIME 类型，作用于整批文件
    #[arg(long)]
    mime: Option<String>,
    /// 整批上传的超时时间（秒）
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// 打印当前设置（密钥已遮盖）
    Show,
    /// 修改设置并保存
    Set(SetArgs),
}

#[derive(Debug, Args)]
struct SetArgs {
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    delete_key: Option<String>,
    #[arg(long)]
    expiry: Option<u64>,
    #[arg(long)]
    randomize: Option<bool>,
    #[arg(long)]
    convert_heic: Option<bool>,
    #[arg(long)]
    notify_single: Option<bool>,
    #[arg(long)]
    notify_multi: Option<bool>,
    #[arg(long)]
    max_concurrent: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let store = JsonSettingsStore::new(cli.config);

    let outcome = match cli.command {
        Command::Upload(args) => run_upload(&store, args).await,
        Command::Settings(SettingsCommand::Show) => show_settings(&store),
        Command::Settings(SettingsCommand::Set(args)) => set_settings(&store, args),
        Command::Copy { url } => copy_url(&url).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_upload(store: &JsonSettingsStore, args: UploadArgs) -> Result<ExitCode, AppError> {
    let settings = store.snapshot()?;
    let config = UploadConfiguration::from_settings(
        &settings,
        UploadOverrides {
            delete_key: args.delete_key,
            expiration: args.expiration,
            randomize_filename: args.randomize,
            convert_heic_to_jpeg: args.convert_heic,
            filename: args.filename,
        },
    );

    let references = args
        .files
        .iter()
        .map(|path| FileReference::from_path(path, args.mime.as_deref()))
        .collect();
    let batch = UploadBatch::new(references)?;
    let file_count = batch.len();

    let uploader = Uploader::new(
        Arc::new(LocalFileResolver),
        UploaderConfig::from_settings(&settings),
    )?;
    let coordinator = UploadCoordinator::new(
        uploader,
        Arc::new(SystemClipboard::default()),
        Arc::new(LogNotifier::default()),
    );

    let run = coordinator.run(batch, config, settings.notification_prefs());
    let result = match args.timeout {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("⏱️ 上传超过 {} 秒未完成，放弃等待", secs);
                BatchResult::Failure {
                    message: UPLOAD_FAILED_MESSAGE.to_string(),
                }
            }
        },
        None => run.await,
    };

    Ok(match result {
        BatchResult::Success { url: Some(url) } => {
            println!("{url}");
            ExitCode::SUCCESS
        }
        BatchResult::Success { url: None } => {
            println!("已上传 {file_count} 个文件");
            ExitCode::SUCCESS
        }
        BatchResult::Failure { message } => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    })
}

fn show_settings(store: &JsonSettingsStore) -> Result<ExitCode, AppError> {
    let settings = store.snapshot()?;
    let rendered = serde_json::to_string_pretty(&settings.masked())
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

fn set_settings(store: &JsonSettingsStore, args: SetArgs) -> Result<ExitCode, AppError> {
    if args.max_concurrent == Some(0) {
        return Err(AppError::InvalidInput("max-concurrent 至少为 1".to_string()));
    }

    let patch = SettingsPatch {
        endpoint_url: args.url,
        api_key: args.api_key,
        delete_key: args.delete_key,
        expiration: args.expiry,
        randomize_filename: args.randomize,
        convert_heic_to_jpeg: args.convert_heic,
        notify_single: args.notify_single,
        notify_multi: args.notify_multi,
        max_concurrent_uploads: args.max_concurrent,
    };
    if patch.is_empty() {
        return Err(AppError::InvalidInput("未指定任何要修改的设置".to_string()));
    }

    store.update(patch)?;
    println!("设置已保存到 {}", store.path().display());
    Ok(ExitCode::SUCCESS)
}

async fn copy_url(url: &str) -> Result<ExitCode, AppError> {
    SystemClipboard::default().copy_text(url).await?;
    println!("已复制 {url}");
    Ok(ExitCode::SUCCESS)
}
