use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 样本类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleType {
    pub sample_id: String,
    pub description: String,
}

/// 固定的样本类型目录
pub const SAMPLE_CATALOG: [(&str, &str); 6] = [
    ("plasma", "raw blood plasma"),
    ("PMBC", "raw peripheral blood mononuclear cells"),
    ("hDNA", "extracted host DNA"),
    ("vDNA", "extracted viral DNA"),
    ("hRNA", "extracted host RNA"),
    ("vRNA", "extracted viral RNA"),
];

/// 样本类型目录
pub fn sample_types() -> Vec<SampleType> {
    SAMPLE_CATALOG
        .iter()
        .map(|(id, description)| SampleType {
            sample_id: id.to_string(),
            description: description.to_string(),
        })
        .collect()
}

/// 样本清单记录
///
/// `creation_date` 和 `storage_loc` 在采样入库后才填写，生成时为空。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleRecord {
    pub patient_id: String,
    pub timepoint: u32,
    pub sample_id: String,
    pub description: String,
    pub creation_date: Option<NaiveDate>,
    pub storage_loc: Option<String>,
    pub invalid: bool,
}

impl SampleRecord {
    pub fn new(patient_id: &str, timepoint: u32, sample_type: &SampleType) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            timepoint,
            sample_id: sample_type.sample_id.clone(),
            description: sample_type.description.clone(),
            creation_date: None,
            storage_loc: None,
            invalid: false,
        }
    }
}
