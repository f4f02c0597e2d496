use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::table::{Table, is_null_cell};

/// 实验列表中的已知列
pub const EXPT_ID: &str = "expt_id";
pub const TIMEPTS: &str = "timepts";
pub const FILE_TYPES: &str = "file_types";
pub const PARAMS: &str = "params";
pub const DROPBOX: &str = "dropbox";

/// 实验定义（`expt_list.csv` 的一行）
///
/// `timepts` / `file_types` / `params` 为逗号分隔的列表单元格；
/// 其余未识别的列原样保存在 `attributes` 中并随文件清单输出。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExperimentDef {
    pub expt_id: String,
    pub timepts: Option<String>,
    pub file_types: Option<String>,
    pub params: Option<String>,
    /// 该实验文件的 Dropbox 目标目录
    pub dropbox: Option<String>,
    pub attributes: Vec<(String, String)>,
}

impl ExperimentDef {
    pub fn new(expt_id: &str) -> Self {
        Self {
            expt_id: expt_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_timepts(mut self, timepts: &str) -> Self {
        self.timepts = Some(timepts.to_string());
        self
    }

    pub fn with_file_types(mut self, file_types: &str) -> Self {
        self.file_types = Some(file_types.to_string());
        self
    }

    pub fn with_params(mut self, params: &str) -> Self {
        self.params = Some(params.to_string());
        self
    }

    pub fn with_dropbox(mut self, folder: &str) -> Self {
        self.dropbox = Some(folder.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }
}

/// 从 CSV 表解析实验列表
pub fn parse_experiments(table: &Table) -> Result<Vec<ExperimentDef>> {
    let id_col = table
        .column(EXPT_ID)
        .ok_or_else(|| AppError::Validation(format!("实验列表缺少 {} 列", EXPT_ID)))?;
    let known = [EXPT_ID, TIMEPTS, FILE_TYPES, PARAMS, DROPBOX];

    let mut defs = Vec::with_capacity(table.len());
    for row in &table.rows {
        let expt_id = row[id_col].trim();
        if is_null_cell(expt_id) {
            continue;
        }
        let cell = |name: &str| -> Option<String> {
            table
                .column(name)
                .map(|i| row[i].trim())
                .filter(|v| !is_null_cell(v))
                .map(str::to_string)
        };
        let attributes = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !known.contains(&h.as_str()))
            .map(|(i, h)| (h.clone(), row[i].clone()))
            .collect();

        defs.push(ExperimentDef {
            expt_id: expt_id.to_string(),
            timepts: cell(TIMEPTS),
            file_types: cell(FILE_TYPES),
            params: cell(PARAMS),
            dropbox: cell(DROPBOX),
            attributes,
        });
    }
    Ok(defs)
}

/// 展开后的实验行：一个 (时间点, 文件类型, 参数) 组合
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRow {
    pub expt_id: String,
    pub timepts: Option<String>,
    pub file_types: Option<String>,
    pub params: Option<String>,
    pub dropbox: Option<String>,
    pub attributes: Vec<(String, String)>,
}

/// 预期文件
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedFile {
    pub patient_id: String,
    pub timepoints: u32,
    pub timepts: String,
    pub expt_id: String,
    pub file_types: String,
    pub params: Option<String>,
    pub dropbox: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub filename: String,
    /// 对账后填写：Dropbox 上的修改时间
    pub date_modified: Option<DateTime<Utc>>,
    /// 对账后填写：文件是否已上传
    pub status: Option<bool>,
}

/// 文件名规则：`{patient_id}_T{timepts}_{expt_id}{file_types}`
pub fn expected_filename(
    patient_id: &str,
    timepts: &str,
    expt_id: &str,
    file_types: &str,
) -> String {
    format!("{}_T{}_{}{}", patient_id, timepts, expt_id, file_types)
}

/// 预期文件清单转为表（附加列按首次出现的顺序排列）
pub fn expected_files_table(files: &[ExpectedFile]) -> Table {
    let mut extra: Vec<String> = Vec::new();
    for file in files {
        for (key, _) in &file.attributes {
            if !extra.contains(key) {
                extra.push(key.clone());
            }
        }
    }

    let mut headers: Vec<String> = [
        "patient_id",
        "timepoints",
        "timepts",
        EXPT_ID,
        FILE_TYPES,
        PARAMS,
        DROPBOX,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    headers.extend(extra.iter().cloned());
    headers.extend(["filename", "date_modified", "status"].iter().map(|s| s.to_string()));

    let mut table = Table::new(headers);
    for file in files {
        let mut row = vec![
            file.patient_id.clone(),
            file.timepoints.to_string(),
            file.timepts.clone(),
            file.expt_id.clone(),
            file.file_types.clone(),
            file.params.clone().unwrap_or_default(),
            file.dropbox.clone().unwrap_or_default(),
        ];
        for key in &extra {
            let value = file
                .attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            row.push(value);
        }
        row.push(file.filename.clone());
        row.push(
            file.date_modified
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
        );
        row.push(file.status.map(|s| s.to_string()).unwrap_or_default());
        table.push_row(row);
    }
    table
}
