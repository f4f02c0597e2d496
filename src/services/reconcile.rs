//! 上传对账
//!
//! 列出 `{root}/Data` 下各数据目录中的实际文件，按文件名与预期清单关联并标记状态。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::dropbox::FileStore;
use crate::error::Result;
use crate::models::experiment::ExpectedFile;
use crate::models::listing::ListingEntry;

/// 对账结果
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 扫描到的数据目录数
    pub folders: usize,
    /// 扫描到的文件数
    pub listed: usize,
    /// 已上传的预期文件数
    pub present: usize,
    /// 缺失的预期文件数
    pub absent: usize,
}

/// 列出数据目录下一层子目录中的所有文件，同时返回扫描过的子目录数
///
/// 数据目录不存在时视为没有任何上传。
pub async fn list_uploaded(
    store: &dyn FileStore,
    data_folder: &str,
) -> Result<(usize, Vec<ListingEntry>)> {
    let top = match store.list_folder(data_folder).await {
        Ok(entries) => entries,
        Err(e) if e.is_not_found() => {
            tracing::warn!("Data folder {} does not exist yet", data_folder);
            return Ok((0, Vec::new()));
        }
        Err(e) => return Err(e),
    };

    let folders: Vec<String> = top
        .iter()
        .filter(|e| e.is_folder())
        .filter_map(|e| e.path_display().map(str::to_string))
        .collect();

    let mut listing = Vec::new();
    for folder in &folders {
        tracing::debug!("Scanning {}", folder);
        let entries = store.list_folder(folder).await?;
        listing.extend(
            entries
                .iter()
                .filter(|e| e.as_file().is_some())
                .map(ListingEntry::from),
        );
    }
    tracing::info!(
        "Found {} files in {} data folders",
        listing.len(),
        folders.len()
    );
    Ok((folders.len(), listing))
}

/// 按文件名标记预期文件状态
///
/// 同名文件出现在多个目录时取最新的修改时间，不会使预期清单行数增加。
pub fn mark_status(files: &mut [ExpectedFile], listing: &[ListingEntry]) {
    let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for entry in listing {
        if let Some(modified) = entry.date_modified {
            latest
                .entry(entry.name.as_str())
                .and_modify(|d| {
                    if modified > *d {
                        *d = modified;
                    }
                })
                .or_insert(modified);
        }
    }

    for file in files.iter_mut() {
        file.date_modified = latest.get(file.filename.as_str()).copied();
        file.status = Some(file.date_modified.is_some());
    }
}

/// 执行对账
pub async fn reconcile(
    store: &dyn FileStore,
    data_folder: &str,
    files: &mut [ExpectedFile],
) -> Result<ReconcileReport> {
    let (folders, listing) = list_uploaded(store, data_folder).await?;
    mark_status(files, &listing);

    let present = files.iter().filter(|f| f.status == Some(true)).count();
    let report = ReconcileReport {
        folders,
        listed: listing.len(),
        present,
        absent: files.len() - present,
    };
    tracing::info!(
        "Reconciliation: {} present, {} absent",
        report.present,
        report.absent
    );
    Ok(report)
}
