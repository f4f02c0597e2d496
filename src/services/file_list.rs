//! 预期文件清单
//!
//! 实验定义中的列表列展开后与患者时间点关联，推导每个患者每个时间点应有的文件名。

use crate::error::Result;
use crate::models::experiment::{
    ExpectedFile, ExperimentDef, ExperimentRow, expected_filename, parse_experiments,
};
use crate::models::patient::Patient;
use crate::table::{Table, split_list};

/// 从 CSV 字节解析实验列表
pub fn read_experiments(bytes: &[u8]) -> Result<Vec<ExperimentDef>> {
    let table = Table::parse_csv(bytes)?;
    parse_experiments(&table)
}

/// 展开单个实验
///
/// 时间点 × 文件类型为内连接；与参数为外连接：没有参数的实验保留 `params = None`，
/// 只有参数而没有时间点/文件类型的实验产生时间点为空的行（不会匹配任何患者）。
pub fn expand_experiment(def: &ExperimentDef) -> Vec<ExperimentRow> {
    let times = def.timepts.as_deref().map(split_list).unwrap_or_default();
    let file_types = def.file_types.as_deref().map(split_list).unwrap_or_default();
    let params = def.params.as_deref().map(split_list).unwrap_or_default();

    let combos: Vec<(Option<String>, Option<String>)> = times
        .iter()
        .flat_map(|t| {
            file_types
                .iter()
                .map(move |f| (Some(t.clone()), Some(f.clone())))
        })
        .collect();

    let row = |timepts: Option<String>, file_types: Option<String>, params: Option<String>| {
        ExperimentRow {
            expt_id: def.expt_id.clone(),
            timepts,
            file_types,
            params,
            dropbox: def.dropbox.clone(),
            attributes: def.attributes.clone(),
        }
    };

    match (combos.is_empty(), params.is_empty()) {
        (true, true) => Vec::new(),
        (false, true) => combos.into_iter().map(|(t, f)| row(t, f, None)).collect(),
        (true, false) => params.into_iter().map(|p| row(None, None, Some(p))).collect(),
        (false, false) => combos
            .iter()
            .flat_map(|(t, f)| {
                params
                    .iter()
                    .map(move |p| row(t.clone(), f.clone(), Some(p.clone())))
            })
            .collect(),
    }
}

/// 展开全部实验
pub fn expand_experiments(defs: &[ExperimentDef]) -> Vec<ExperimentRow> {
    defs.iter().flat_map(expand_experiment).collect()
}

/// 患者时间点与实验行按时间点关联，生成预期文件清单
///
/// 未匹配任何实验的患者时间点不产生文件。同一文件名可能因多个参数值重复出现。
pub fn build_file_list(patients: &[Patient], rows: &[ExperimentRow]) -> Vec<ExpectedFile> {
    let mut files = Vec::new();
    for patient in patients {
        for &timepoint in &patient.timepoints {
            let timepts = timepoint.to_string();
            for row in rows {
                let (Some(row_time), Some(file_types)) = (&row.timepts, &row.file_types) else {
                    continue;
                };
                if *row_time != timepts {
                    continue;
                }
                files.push(ExpectedFile {
                    patient_id: patient.patient_id.clone(),
                    timepoints: timepoint,
                    timepts: timepts.clone(),
                    expt_id: row.expt_id.clone(),
                    file_types: file_types.clone(),
                    params: row.params.clone(),
                    dropbox: row.dropbox.clone(),
                    attributes: row.attributes.clone(),
                    filename: expected_filename(
                        &patient.patient_id,
                        &timepts,
                        &row.expt_id,
                        file_types,
                    ),
                    date_modified: None,
                    status: None,
                });
            }
        }
    }
    tracing::info!(
        "Derived {} expected files for {} patients",
        files.len(),
        patients.len()
    );
    files
}
