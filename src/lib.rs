//! # linx-share — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 命令行前端 (main.rs / clap)               │
//! │   upload FILE...   settings show|set   copy URL          │
//! └───────┬──────────────────────────────────────────────────┘
//!         │ SettingsSnapshot + UploadOverrides + UploadBatch
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓                核心 (Rust)                        │
//! │                                                          │
//! │  ┌─ settings ──── JSON 设置文件 → 快照                     │
//! │  │                                                       │
//! │  ├─ upload ────── UploadCoordinator                       │
//! │  │   ├─ endpoint     地址拆分 + Basic 凭据                │
//! │  │   ├─ filename     文件名策略                           │
//! │  │   ├─ normalize    HEIC/HEIF → JPEG                     │
//! │  │   ├─ resolver     文件引用 → 读取流 + MIME             │
//! │  │   └─ uploader     PUT / multipart POST                 │
//! │  │                                                       │
//! │  ├─ clipboard ─── ClipboardSink (arboard + 重试)          │
//! │  ├─ notify ────── Notifier (权限判定 + 确定性通知 ID)     │
//! │  └─ error ─────── AppError (统一错误类型)                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 设置快照、JSON 持久化、部分更新 |
//! | [`upload`] | 批次上传编排、单项请求构造、文件名与转码策略 |
//! | [`clipboard`] | 剪贴板写入能力与系统实现 |
//! | [`notify`] | 上传完成通知能力与日志实现 |

pub mod clipboard;
pub mod error;
pub mod notify;
pub mod settings;
pub mod upload;
