//! 核心数据模型模块
//!
//! 模拟患者、样本、实验定义与预期文件，以及 Dropbox 目录列表条目。

pub mod experiment;
pub mod listing;
pub mod patient;
pub mod sample;

pub use experiment::{ExpectedFile, ExperimentDef, ExperimentRow};
pub use listing::ListingEntry;
pub use patient::{Cohort, Exposure, Patient, Sex};
pub use sample::{SampleRecord, SampleType};
