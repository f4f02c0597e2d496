//! Dropbox 存储层
//!
//! [`FileStore`] 抽象了原型所需的 Dropbox 文件操作；[`client::DropboxClient`]
//! 通过 HTTP API 实现，[`memory::MemoryStore`] 为离线 (dry-run) 与测试实现。
//! 所有调用均为一次请求，不做重试。

pub mod client;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::config::DropboxConfig;
use crate::error::{AppError, Result};
use crate::observability::RunMetrics;
use types::{Account, FileMetadata, FolderMetadata, Metadata, WriteMode};

/// 单次上传大小上限（150 MiB），更大的文件需要上传会话，此处不支持
pub const MAX_UPLOAD_BYTES: usize = 150 * 1024 * 1024;

/// `{root}/Data` 下的数据目录
pub const DATA_FOLDERS: [&str; 6] = [
    "Metadata",
    "Kenzen",
    "Piccolo",
    "Vitals",
    "ELISA",
    "HLA Sequencing",
];

/// 文件存储 trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// 当前账户信息
    async fn current_account(&self) -> Result<Account>;

    /// 列出目录下的全部条目（自动翻页）
    async fn list_folder(&self, path: &str) -> Result<Vec<Metadata>>;

    /// 获取单个路径的元数据
    async fn get_metadata(&self, path: &str) -> Result<Metadata>;

    /// 下载文件
    async fn download(&self, path: &str) -> Result<(FileMetadata, Vec<u8>)>;

    /// 上传文件
    async fn upload(&self, contents: Vec<u8>, path: &str, mode: WriteMode)
    -> Result<FileMetadata>;

    /// 创建目录
    async fn create_folder(&self, path: &str) -> Result<FolderMetadata>;
}

/// 规范化 API 路径：根目录为 `""`，其余路径以 `/` 开头且不以 `/` 结尾
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return String::new();
    }
    if trimmed.starts_with("id:") || trimmed.starts_with("rev:") || trimmed.starts_with("ns:") {
        return trimmed.to_string();
    }
    let without_trailing = trimmed.trim_end_matches('/');
    if without_trailing.starts_with('/') {
        without_trailing.to_string()
    } else {
        format!("/{}", without_trailing)
    }
}

/// 拼接目录与文件名
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{}/{}", folder, name)
}

/// 上传前检查大小
pub fn check_upload_size(size: usize) -> Result<()> {
    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::PayloadTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// 创建 `{root}/Data/<name>` 数据目录，已存在的目录跳过
pub async fn create_data_folders(store: &dyn FileStore, root: &str) -> Result<Vec<String>> {
    let data = join_path(root, "Data");
    let mut created = Vec::new();
    for folder in DATA_FOLDERS {
        let path = join_path(&data, folder);
        tracing::info!("Creating folder: {}", path);
        match store.create_folder(&path).await {
            Ok(meta) => created.push(meta.path_display.unwrap_or(path)),
            Err(AppError::Conflict(summary)) => {
                tracing::debug!("Folder {} already exists ({})", path, summary);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(created)
}

/// 根据配置创建存储实例
///
/// `offline` 为 true 时返回内存存储，不发出任何网络请求。
pub fn create_file_store(
    config: &DropboxConfig,
    offline: bool,
    metrics: Arc<RunMetrics>,
) -> Result<Arc<dyn FileStore>> {
    if offline {
        tracing::info!("Using in-memory file store (dry run)");
        return Ok(Arc::new(memory::MemoryStore::with_metrics(metrics)));
    }
    let client = client::DropboxClient::new(config)?.with_metrics(metrics);
    Ok(Arc::new(client))
}
