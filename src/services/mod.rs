//! 服务模块

pub mod dummy_upload;
pub mod file_list;
pub mod patient_generator;
pub mod pipeline;
pub mod reconcile;
pub mod sample_expansion;

pub use dummy_upload::DummyUploader;
pub use file_list::{build_file_list, expand_experiments};
pub use patient_generator::{PatientGenerator, fake_patients};
pub use pipeline::{ExperimentSource, Pipeline, RunReport, create_pipeline};
pub use reconcile::{ReconcileReport, reconcile};
pub use sample_expansion::expand_samples;
