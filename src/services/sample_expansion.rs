//! 样本清单展开
//!
//! 患者时间点 × 样本类型目录。第 0 天不采集生物样本。

use crate::models::patient::Patient;
use crate::models::sample::{SampleRecord, SampleType, sample_types};
use crate::table::explode;

/// 患者时间点长格式 `(patient_id, timepoint)`
pub fn patient_timepoints(patients: &[Patient]) -> Vec<(String, u32)> {
    explode(
        patients
            .iter()
            .map(|p| (p.patient_id.clone(), Some(p.timepoints.clone()))),
    )
}

/// 使用默认目录展开样本清单
pub fn expand_samples(patients: &[Patient]) -> Vec<SampleRecord> {
    expand_samples_with(patients, &sample_types())
}

/// 使用指定目录展开样本清单，按患者、时间点、目录顺序排列
pub fn expand_samples_with(patients: &[Patient], catalog: &[SampleType]) -> Vec<SampleRecord> {
    let samples: Vec<SampleRecord> = patient_timepoints(patients)
        .into_iter()
        .filter(|(_, timepoint)| *timepoint > 0)
        .flat_map(|(patient_id, timepoint)| {
            catalog
                .iter()
                .map(move |sample_type| SampleRecord::new(&patient_id, timepoint, sample_type))
        })
        .collect();
    tracing::info!(
        "Expanded {} patients into {} sample records",
        patients.len(),
        samples.len()
    );
    samples
}
