//! # 单项上传模块
//!
//! ## 设计思路
//!
//! 一次调用只处理一个文件引用：打开文件、决定是否转码、构造请求、解析响应。
//! 所有失败（打开文件、网络、非 2xx、响应缺少 `url`）在这里统一折叠为 `None`，
//! 原因只写日志，不向协调器区分。
//!
//! ## 请求约定
//!
//! - 随机文件名：`PUT <endpoint>/upload/` + `Linx-Randomize: yes`，请求体为文件本身
//! - 显式文件名：`POST <endpoint>/upload/`，multipart 字段 `file` 携带文件名
//! - 公共头：`Accept`、`Linx-Delete-Key`、`Linx-Expiry`、`Linx-Api-Key`，以及可选的 `Authorization`

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use super::normalize::{normalize, should_convert};
use super::{
    Endpoint, FileReference, FileResolver, UploadConfiguration, UploadError, UploaderConfig,
    resolve_filename,
};

const HEADER_DELETE_KEY: &str = "Linx-Delete-Key";
const HEADER_EXPIRY: &str = "Linx-Expiry";
const HEADER_API_KEY: &str = "Linx-Api-Key";
const HEADER_RANDOMIZE: &str = "Linx-Randomize";
const JPEG_MIME: &str = "image/jpeg";

/// 服务端成功响应，只关心 `url` 字段，其余字段忽略。
#[derive(Debug, Deserialize)]
struct LinxResponse {
    url: String,
}

/// 准备好的请求体。
struct PreparedBody {
    body: reqwest::Body,
    mime_type: Option<String>,
    was_converted: bool,
}

/// 单项上传执行器。
///
/// 持有复用的 HTTP 客户端与文件解析能力，可在多个任务间通过 `Arc` 共享。
pub struct Uploader {
    client: reqwest::Client,
    resolver: Arc<dyn FileResolver>,
    config: UploaderConfig,
}

impl Uploader {
    /// 创建执行器并构建复用型 HTTP 客户端。
    pub fn new(resolver: Arc<dyn FileResolver>, config: UploaderConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| UploadError::Network(format!("HTTP 客户端初始化失败：{}", e)))?;

        Ok(Self::with_client(client, resolver, config))
    }

    pub fn with_client(
        client: reqwest::Client,
        resolver: Arc<dyn FileResolver>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            client,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// 上传单个文件，成功返回公开 URL，任何失败返回 `None`。
    pub async fn upload(
        &self,
        reference: &FileReference,
        config: &UploadConfiguration,
        endpoint: &Endpoint,
        batch_size: usize,
    ) -> Option<String> {
        let started = Instant::now();
        match self.try_upload(reference, config, endpoint, batch_size).await {
            Ok(url) => {
                log::info!(
                    "✅ 上传成功 - 句柄: {} 耗时: {}ms",
                    reference.handle,
                    started.elapsed().as_millis()
                );
                Some(url)
            }
            Err(err) => {
                log::warn!(
                    "❌ 上传失败 - 句柄: {} 耗时: {}ms 原因: {}",
                    reference.handle,
                    started.elapsed().as_millis(),
                    err
                );
                None
            }
        }
    }

    async fn try_upload(
        &self,
        reference: &FileReference,
        config: &UploadConfiguration,
        endpoint: &Endpoint,
        batch_size: usize,
    ) -> Result<String, UploadError> {
        let prepared = self.prepare_body(reference, config).await?;

        let builder = if config.randomize_filename {
            let builder = self
                .client
                .put(endpoint.upload_url())
                .header(HEADER_RANDOMIZE, "yes");
            let builder = match prepared.mime_type.as_deref() {
                Some(mime) => builder.header(CONTENT_TYPE, mime),
                None => builder,
            };
            builder.body(prepared.body)
        } else {
            let filename = resolve_filename(
                reference.name_hint.as_deref(),
                reference.mime_type.as_deref().or(prepared.mime_type.as_deref()),
                &config.filename,
                batch_size,
                prepared.was_converted,
            );
            log::debug!("📝 multipart 文件名: {}", filename);

            let part = reqwest::multipart::Part::stream(prepared.body).file_name(filename);
            let part = match prepared.mime_type.as_deref() {
                Some(mime) => part
                    .mime_str(mime)
                    .map_err(|e| UploadError::InvalidRequest(format!("非法 MIME '{}'：{}", mime, e)))?,
                None => part,
            };
            let form = reqwest::multipart::Form::new().part("file", part);
            self.client.post(endpoint.upload_url()).multipart(form)
        };

        let mut builder = builder
            .header(ACCEPT, "application/json")
            .header(HEADER_DELETE_KEY, &config.delete_key)
            .header(HEADER_EXPIRY, config.expiration.to_string())
            .header(HEADER_API_KEY, &config.api_key);
        if let Some(authorization) = &endpoint.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UploadError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Network(format!("读取响应失败：{}", e.without_url())))?;
        parse_response_url(&body)
    }

    /// 打开文件并决定请求体：需要转码且转码成功时上传 JPEG，否则上传原始字节。
    async fn prepare_body(
        &self,
        reference: &FileReference,
        config: &UploadConfiguration,
    ) -> Result<PreparedBody, UploadError> {
        let opened = self.resolver.open(reference).await?;
        let source_mime = opened.mime_type.or_else(|| reference.mime_type.clone());

        if !should_convert(
            reference.name_hint.as_deref(),
            source_mime.as_deref(),
            config.convert_heic_to_jpeg,
        ) {
            return Ok(PreparedBody {
                body: reqwest::Body::wrap_stream(ReaderStream::new(opened.reader)),
                mime_type: source_mime,
                was_converted: false,
            });
        }

        // 转码需要完整解码，只能整块缓冲
        let mut reader = opened.reader;
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| UploadError::FileSystem(format!("读取文件失败：{}", e)))?;
        let original = Bytes::from(buffer);

        match normalize(original.clone(), self.config.clone()).await {
            Some(jpeg) => Ok(PreparedBody {
                body: reqwest::Body::from(jpeg),
                mime_type: Some(JPEG_MIME.to_string()),
                was_converted: true,
            }),
            None => Ok(PreparedBody {
                body: reqwest::Body::from(original),
                mime_type: source_mime,
                was_converted: false,
            }),
        }
    }
}

/// 从成功响应中取出 `url`；缺失、类型不符或 JSON 非法都视为失败。
fn parse_response_url(body: &str) -> Result<String, UploadError> {
    serde_json::from_str::<LinxResponse>(body)
        .map(|response| response.url)
        .map_err(|e| UploadError::InvalidResponse(format!("无法解析响应：{}", e)))
}
