//! Dropbox API v2 数据类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 文件元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    pub client_modified: DateTime<Utc>,
    pub server_modified: DateTime<Utc>,
    pub rev: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// 目录元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderMetadata {
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
}

/// 已删除条目元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeletedMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_lower: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
}

/// 元数据（按 `.tag` 区分）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

impl Metadata {
    pub fn name(&self) -> &str {
        match self {
            Metadata::File(m) => &m.name,
            Metadata::Folder(m) => &m.name,
            Metadata::Deleted(m) => &m.name,
        }
    }

    pub fn path_display(&self) -> Option<&str> {
        match self {
            Metadata::File(m) => m.path_display.as_deref(),
            Metadata::Folder(m) => m.path_display.as_deref(),
            Metadata::Deleted(m) => m.path_display.as_deref(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Metadata::Folder(_))
    }

    pub fn as_file(&self) -> Option<&FileMetadata> {
        match self {
            Metadata::File(m) => Some(m),
            _ => None,
        }
    }
}

/// 上传写入模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// 路径已存在时报冲突
    Add,
    /// 覆盖已存在的文件
    Overwrite,
}

impl WriteMode {
    pub fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::Add
        }
    }
}

/// 账户名称
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountName {
    pub display_name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub surname: String,
}

/// 当前账户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub account_id: String,
    pub name: AccountName,
    #[serde(default)]
    pub email: String,
}

/// `list_folder` / `list_folder/continue` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

/// `create_folder_v2` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderResult {
    pub metadata: FolderMetadata,
}

/// 路径参数
#[derive(Debug, Clone, Serialize)]
pub struct PathArg<'a> {
    pub path: &'a str,
}

/// `list_folder` 参数
#[derive(Debug, Clone, Serialize)]
pub struct ListFolderArg<'a> {
    pub path: &'a str,
    pub recursive: bool,
}

/// `list_folder/continue` 参数
#[derive(Debug, Clone, Serialize)]
pub struct CursorArg<'a> {
    pub cursor: &'a str,
}

/// `upload` 参数
#[derive(Debug, Clone, Serialize)]
pub struct UploadArg<'a> {
    pub path: &'a str,
    pub mode: WriteMode,
    pub autorename: bool,
    pub mute: bool,
}

/// `create_folder_v2` 参数
#[derive(Debug, Clone, Serialize)]
pub struct CreateFolderArg<'a> {
    pub path: &'a str,
    pub autorename: bool,
}
