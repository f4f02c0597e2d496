use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dropbox::types::Metadata;

/// Dropbox 目录列表项（对账用）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingEntry {
    pub name: String,
    pub path_display: String,
    /// 服务器端修改时间 (UTC)，目录项为空
    pub date_modified: Option<DateTime<Utc>>,
}

impl From<&Metadata> for ListingEntry {
    fn from(entry: &Metadata) -> Self {
        match entry {
            Metadata::File(file) => Self {
                name: file.name.clone(),
                path_display: file.path_display.clone().unwrap_or_default(),
                date_modified: Some(file.server_modified),
            },
            Metadata::Folder(folder) => Self {
                name: folder.name.clone(),
                path_display: folder.path_display.clone().unwrap_or_default(),
                date_modified: None,
            },
            Metadata::Deleted(deleted) => Self {
                name: deleted.name.clone(),
                path_display: deleted.path_display.clone().unwrap_or_default(),
                date_modified: None,
            },
        }
    }
}
