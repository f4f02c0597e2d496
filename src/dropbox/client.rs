//! Dropbox HTTP 客户端
//!
//! 直接调用 Dropbox API v2：RPC 端点走 `api_url`，上传/下载走 `content_url`，
//! 内容端点的参数放在 `Dropbox-API-Arg` 请求头中。

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::types::{
    Account, CreateFolderArg, CreateFolderResult, CursorArg, FileMetadata, FolderMetadata,
    ListFolderArg, ListFolderResult, Metadata, PathArg, UploadArg, WriteMode,
};
use super::{FileStore, check_upload_size, normalize_path};
use crate::config::config::DropboxConfig;
use crate::error::{AppError, Result};
use crate::observability::RunMetrics;

const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const API_RESULT_HEADER: &str = "Dropbox-API-Result";

/// Dropbox 客户端
#[derive(Clone)]
pub struct DropboxClient {
    http_client: reqwest::Client,
    token: String,
    api_url: String,
    content_url: String,
    metrics: Arc<RunMetrics>,
}

impl DropboxClient {
    /// 创建新的客户端
    pub fn new(config: &DropboxConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http_client,
            token: config.token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            content_url: config.content_url.trim_end_matches('/').to_string(),
            metrics: Arc::new(RunMetrics::default()),
        })
    }

    /// 共享运行指标
    pub fn with_metrics(mut self, metrics: Arc<RunMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn rpc_url(&self, endpoint: &str) -> String {
        format!("{}/2/{}", self.api_url, endpoint)
    }

    fn content_endpoint(&self, endpoint: &str) -> String {
        format!("{}/2/{}", self.content_url, endpoint)
    }

    /// 执行 RPC 调用（JSON 请求体，JSON 响应）
    async fn rpc<A, R>(&self, endpoint: &str, arg: Option<&A>) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        tracing::debug!("Dropbox RPC: {}", endpoint);
        self.metrics.record_api_call();

        let mut request = self
            .http_client
            .post(self.rpc_url(endpoint))
            .bearer_auth(&self.token);
        if let Some(arg) = arg {
            request = request.json(arg);
        }

        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// 使用共享链接下载公开文件（无需认证）
    ///
    /// 链接的 `dl` 参数会被强制设为 `1` 以获取原始内容而非预览页。
    pub async fn fetch_shared_link(&self, link: &str) -> Result<Vec<u8>> {
        let url = direct_download_url(link)?;
        tracing::info!("Fetching shared link: {}", url);
        self.metrics.record_api_call();

        let response = check_status(self.http_client.get(url).send().await?).await?;
        let bytes = response.bytes().await?.to_vec();
        self.metrics.record_download(bytes.len());
        Ok(bytes)
    }
}

#[async_trait]
impl FileStore for DropboxClient {
    async fn current_account(&self) -> Result<Account> {
        self.rpc::<(), Account>("users/get_current_account", None)
            .await
    }

    async fn list_folder(&self, path: &str) -> Result<Vec<Metadata>> {
        let path = normalize_path(path);
        tracing::info!("Listing folder: '{}'", path);

        let arg = ListFolderArg {
            path: &path,
            recursive: false,
        };
        let mut page: ListFolderResult = self.rpc("files/list_folder", Some(&arg)).await?;
        let mut entries = std::mem::take(&mut page.entries);

        while page.has_more {
            tracing::debug!("Continuing listing of '{}' (cursor {})", path, page.cursor);
            let cursor = CursorArg {
                cursor: &page.cursor,
            };
            let next: ListFolderResult =
                self.rpc("files/list_folder/continue", Some(&cursor)).await?;
            page = next;
            entries.append(&mut page.entries);
        }

        Ok(entries)
    }

    async fn get_metadata(&self, path: &str) -> Result<Metadata> {
        let path = normalize_path(path);
        self.rpc("files/get_metadata", Some(&PathArg { path: &path }))
            .await
    }

    async fn download(&self, path: &str) -> Result<(FileMetadata, Vec<u8>)> {
        let path = normalize_path(path);
        tracing::info!("Downloading: {}", path);
        self.metrics.record_api_call();

        let response = self
            .http_client
            .post(self.content_endpoint("files/download"))
            .bearer_auth(&self.token)
            .header(API_ARG_HEADER, api_arg_header(&PathArg { path: &path })?)
            .send()
            .await?;
        let response = check_status(response).await?;

        let raw_meta = response
            .headers()
            .get(API_RESULT_HEADER)
            .ok_or_else(|| AppError::Internal(format!("响应缺少 {} 头", API_RESULT_HEADER)))?
            .to_str()
            .map_err(|e| AppError::Serialization(e.to_string()))?
            .to_string();
        let metadata: FileMetadata = serde_json::from_str(&raw_meta)?;

        let bytes = response.bytes().await?.to_vec();
        self.metrics.record_download(bytes.len());
        Ok((metadata, bytes))
    }

    async fn upload(
        &self,
        contents: Vec<u8>,
        path: &str,
        mode: WriteMode,
    ) -> Result<FileMetadata> {
        check_upload_size(contents.len())?;
        let path = normalize_path(path);
        let size = contents.len();
        tracing::info!("Uploading {} bytes to {} (mode: {:?})", size, path, mode);
        self.metrics.record_api_call();

        let arg = UploadArg {
            path: &path,
            mode,
            autorename: false,
            mute: false,
        };
        let response = self
            .http_client
            .post(self.content_endpoint("files/upload"))
            .bearer_auth(&self.token)
            .header(API_ARG_HEADER, api_arg_header(&arg)?)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(contents)
            .send()
            .await?;

        let metadata: FileMetadata = check_status(response).await?.json().await?;
        self.metrics.record_upload(size);
        Ok(metadata)
    }

    async fn create_folder(&self, path: &str) -> Result<FolderMetadata> {
        let path = normalize_path(path);
        tracing::info!("Creating folder: {}", path);
        let arg = CreateFolderArg {
            path: &path,
            autorename: false,
        };
        let result: CreateFolderResult = self.rpc("files/create_folder_v2", Some(&arg)).await?;
        Ok(result.metadata)
    }
}

/// 非 2xx 响应转换为 [`AppError`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!("Dropbox API returned {}: {}", status, body);
    Err(AppError::from_api_response(status.as_u16(), &body))
}

/// 序列化 `Dropbox-API-Arg` 请求头
///
/// HTTP 头只允许 ASCII，非 ASCII 字符（及 DEL）以 `\uXXXX` 转义。
pub fn api_arg_header<T: Serialize + ?Sized>(arg: &T) -> Result<String> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}

/// 共享链接改写为直接下载链接 (`dl=1`)
pub fn direct_download_url(link: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(link)
        .map_err(|e| AppError::Validation(format!("无效的共享链接 '{}': {}", link, e)))?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "dl")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("dl", "1");
    Ok(url)
}
