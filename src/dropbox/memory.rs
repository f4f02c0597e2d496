//! 内存文件存储
//!
//! 与 Dropbox 语义一致的离线实现：路径大小写不敏感，上传时自动创建父目录，
//! add 模式遇到已存在路径返回冲突。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{Account, AccountName, FileMetadata, FolderMetadata, Metadata, WriteMode};
use super::{FileStore, check_upload_size, normalize_path};
use crate::error::{AppError, Result};
use crate::observability::RunMetrics;

#[derive(Debug, Clone)]
enum Entry {
    File { meta: FileMetadata, bytes: Vec<u8> },
    Folder(FolderMetadata),
}

impl Entry {
    fn metadata(&self) -> Metadata {
        match self {
            Entry::File { meta, .. } => Metadata::File(meta.clone()),
            Entry::Folder(meta) => Metadata::Folder(meta.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// 以小写路径为键
    entries: BTreeMap<String, Entry>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("id:mem{:06}", self.next_id)
    }

    fn ensure_folder(&mut self, display: &str) -> Result<FolderMetadata> {
        let key = display.to_lowercase();
        if key.is_empty() {
            return Ok(FolderMetadata {
                name: String::new(),
                id: "id:root".into(),
                path_lower: Some(String::new()),
                path_display: Some(String::new()),
            });
        }
        match self.entries.get(&key) {
            Some(Entry::Folder(meta)) => return Ok(meta.clone()),
            Some(Entry::File { .. }) => {
                return Err(AppError::Conflict(format!("path/conflict/file/{}", display)));
            }
            None => {}
        }
        self.ensure_folder(parent_of(display))?;
        let meta = FolderMetadata {
            name: name_of(display).to_string(),
            id: self.next_id(),
            path_lower: Some(key.clone()),
            path_display: Some(display.to_string()),
        };
        self.entries.insert(key, Entry::Folder(meta.clone()));
        Ok(meta)
    }
}

/// 内存文件存储
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    metrics: Arc<RunMetrics>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: Arc<RunMetrics>) -> Self {
        Self {
            state: Arc::default(),
            metrics,
        }
    }

    /// 存储中的文件数量
    pub async fn file_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .entries
            .values()
            .filter(|e| matches!(e, Entry::File { .. }))
            .count()
    }

    /// 读取文件内容（测试辅助）
    pub async fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let key = normalize_path(path).to_lowercase();
        let state = self.state.lock().await;
        match state.entries.get(&key) {
            Some(Entry::File { bytes, .. }) => Some(bytes.clone()),
            _ => None,
        }
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

fn content_hash(bytes: &[u8]) -> String {
    // FNV-1a, only used to tell revisions apart
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn current_account(&self) -> Result<Account> {
        self.metrics.record_api_call();
        Ok(Account {
            account_id: "dbid:memory".into(),
            name: AccountName {
                display_name: "Offline Store".into(),
                given_name: "Offline".into(),
                surname: "Store".into(),
            },
            email: String::new(),
        })
    }

    async fn list_folder(&self, path: &str) -> Result<Vec<Metadata>> {
        self.metrics.record_api_call();
        let display = normalize_path(path);
        let key = display.to_lowercase();
        let state = self.state.lock().await;

        if !key.is_empty() {
            match state.entries.get(&key) {
                Some(Entry::Folder(_)) => {}
                Some(Entry::File { .. }) => {
                    return Err(AppError::Conflict(format!("path/not_folder/{}", display)));
                }
                None => return Err(AppError::NotFound(format!("path/not_found/{}", display))),
            }
        }

        Ok(state
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key && parent_of(k) == key)
            .map(|(_, e)| e.metadata())
            .collect())
    }

    async fn get_metadata(&self, path: &str) -> Result<Metadata> {
        self.metrics.record_api_call();
        let display = normalize_path(path);
        let state = self.state.lock().await;
        state
            .entries
            .get(&display.to_lowercase())
            .map(Entry::metadata)
            .ok_or_else(|| AppError::NotFound(format!("path/not_found/{}", display)))
    }

    async fn download(&self, path: &str) -> Result<(FileMetadata, Vec<u8>)> {
        self.metrics.record_api_call();
        let display = normalize_path(path);
        let state = self.state.lock().await;
        match state.entries.get(&display.to_lowercase()) {
            Some(Entry::File { meta, bytes }) => {
                self.metrics.record_download(bytes.len());
                Ok((meta.clone(), bytes.clone()))
            }
            Some(Entry::Folder(_)) => Err(AppError::Conflict(format!(
                "path/not_file/{}",
                display
            ))),
            None => Err(AppError::NotFound(format!("path/not_found/{}", display))),
        }
    }

    async fn upload(
        &self,
        contents: Vec<u8>,
        path: &str,
        mode: WriteMode,
    ) -> Result<FileMetadata> {
        check_upload_size(contents.len())?;
        self.metrics.record_api_call();
        let display = normalize_path(path);
        let key = display.to_lowercase();
        let mut state = self.state.lock().await;

        let existing_id = match state.entries.get(&key) {
            Some(Entry::Folder(_)) => {
                return Err(AppError::Conflict(format!("path/conflict/folder/{}", display)));
            }
            Some(Entry::File { .. }) if mode == WriteMode::Add => {
                return Err(AppError::Conflict(format!("path/conflict/file/{}", display)));
            }
            Some(Entry::File { meta, .. }) => Some(meta.id.clone()),
            None => None,
        };

        state.ensure_folder(parent_of(&display))?;

        let now: DateTime<Utc> = Utc::now();
        let id = match existing_id {
            Some(id) => id,
            None => state.next_id(),
        };
        let meta = FileMetadata {
            name: name_of(&display).to_string(),
            id,
            path_lower: Some(key.clone()),
            path_display: Some(display.clone()),
            client_modified: now,
            server_modified: now,
            rev: format!("{:x}", now.timestamp_micros()),
            size: contents.len() as u64,
            content_hash: Some(content_hash(&contents)),
        };
        self.metrics.record_upload(contents.len());
        state.entries.insert(
            key,
            Entry::File {
                meta: meta.clone(),
                bytes: contents,
            },
        );
        Ok(meta)
    }

    async fn create_folder(&self, path: &str) -> Result<FolderMetadata> {
        self.metrics.record_api_call();
        let display = normalize_path(path);
        let key = display.to_lowercase();
        let mut state = self.state.lock().await;
        if key.is_empty() || state.entries.contains_key(&key) {
            return Err(AppError::Conflict(format!("path/conflict/folder/{}", display)));
        }
        state.ensure_folder(&display)
    }
}
