//! 端到端流程
//!
//! 生成患者名册 → 样本清单 → 预期文件清单 → 占位文件上传 → 对账。
//! 各阶段也可单独调用（CLI 的 `generate` / `upload-dummies` / `reconcile`），
//! 阶段之间通过 Dropbox 根目录下的 CSV 文件衔接。

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::config::AppConfig;
use crate::dropbox::FileStore;
use crate::dropbox::types::WriteMode;
use crate::error::{AppError, Result};
use crate::models::experiment::{ExpectedFile, ExperimentDef, expected_files_table};
use crate::models::patient::Patient;
use crate::models::sample::SampleRecord;
use crate::services::dummy_upload::DummyUploader;
use crate::services::file_list::{build_file_list, expand_experiments, read_experiments};
use crate::services::patient_generator::PatientGenerator;
use crate::services::reconcile::{ReconcileReport, reconcile};
use crate::services::sample_expansion::expand_samples;
use crate::table::{Table, from_csv, to_csv};

pub const ROSTER_FILE: &str = "fakepatient_roster.csv";
pub const ROSTER_XLSX_FILE: &str = "fakepatient_roster.xlsx";
pub const ROSTER_SHEET: &str = "raw_data";
pub const SAMPLE_FILE: &str = "fakesample_list.csv";
pub const EXPECTED_FILE: &str = "expected_files.csv";

/// 实验列表来源
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentSource {
    /// 根目录下的 `generator.expt_file`
    Dropbox,
    /// 本地 CSV 文件
    Local(PathBuf),
}

/// `generate` 阶段结果
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub patients: usize,
    pub samples: usize,
    pub published: Vec<String>,
}

/// 完整运行结果
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub patients: usize,
    pub samples: usize,
    pub experiments: usize,
    pub expected_files: usize,
    pub dummies_uploaded: usize,
    pub reconcile: ReconcileReport,
    pub published: Vec<String>,
}

pub struct Pipeline {
    config: AppConfig,
    store: Arc<dyn FileStore>,
}

impl Pipeline {
    pub fn new(config: AppConfig, store: Arc<dyn FileStore>) -> Self {
        Self { config, store }
    }

    fn write_mode(&self) -> WriteMode {
        WriteMode::from_overwrite(self.config.upload.overwrite)
    }

    /// 上传到根目录下的 `name`，配置了输出目录时同时写入本地
    pub async fn publish(&self, name: &str, bytes: Vec<u8>) -> Result<String> {
        if let Some(dir) = &self.config.generator.output_dir {
            write_local(dir, name, &bytes).await?;
        }
        let path = self.config.root_path(name);
        tracing::info!("Publishing {} ({} bytes)", path, bytes.len());
        let meta = self.store.upload(bytes, &path, self.write_mode()).await?;
        Ok(meta.path_display.unwrap_or(path))
    }

    /// 按配置的数量与种子生成患者
    pub fn generate_patients(&self) -> Vec<Patient> {
        PatientGenerator::new(self.config.generator.seed).generate(self.config.generator.patients)
    }

    /// 上传患者名册（CSV，可选 XLSX）
    pub async fn publish_roster(&self, patients: &[Patient]) -> Result<Vec<String>> {
        let mut published = vec![self.publish(ROSTER_FILE, to_csv(patients)?).await?];
        if self.config.generator.write_xlsx {
            let xlsx = Table::from_records(patients)?.to_xlsx(ROSTER_SHEET)?;
            published.push(self.publish(ROSTER_XLSX_FILE, xlsx).await?);
        }
        Ok(published)
    }

    pub async fn publish_samples(&self, samples: &[SampleRecord]) -> Result<String> {
        self.publish(SAMPLE_FILE, to_csv(samples)?).await
    }

    /// 生成并上传患者名册与样本清单
    pub async fn generate(&self) -> Result<(Vec<Patient>, GenerateReport)> {
        let patients = self.generate_patients();
        let samples = expand_samples(&patients);

        let mut published = self.publish_roster(&patients).await?;
        published.push(self.publish_samples(&samples).await?);

        let report = GenerateReport {
            patients: patients.len(),
            samples: samples.len(),
            published,
        };
        Ok((patients, report))
    }

    /// 从 Dropbox 读取之前上传的患者名册
    pub async fn load_roster(&self) -> Result<Vec<Patient>> {
        let path = self.config.root_path(ROSTER_FILE);
        let (_meta, bytes) = self.store.download(&path).await.map_err(|e| match e {
            AppError::NotFound(_) => {
                AppError::NotFound(format!("{} (先运行 generate)", path))
            }
            other => other,
        })?;
        let patients: Vec<Patient> = from_csv(&bytes)?;
        tracing::info!("Loaded {} patients from {}", patients.len(), path);
        Ok(patients)
    }

    pub async fn load_experiments(&self, source: &ExperimentSource) -> Result<Vec<ExperimentDef>> {
        let defs = match source {
            ExperimentSource::Dropbox => {
                let path = self.config.root_path(&self.config.generator.expt_file);
                tracing::info!("Loading experiment list from {}", path);
                let (_meta, bytes) = self.store.download(&path).await?;
                read_experiments(&bytes)?
            }
            ExperimentSource::Local(file) => {
                tracing::info!("Loading experiment list from {}", file.display());
                read_experiments(&tokio::fs::read(file).await?)?
            }
        };
        tracing::info!("Loaded {} experiment definitions", defs.len());
        Ok(defs)
    }

    /// 推导预期文件清单
    pub async fn expected_files(
        &self,
        patients: &[Patient],
        source: &ExperimentSource,
    ) -> Result<(usize, Vec<ExpectedFile>)> {
        let defs = self.load_experiments(source).await?;
        let rows = expand_experiments(&defs);
        Ok((defs.len(), build_file_list(patients, &rows)))
    }

    /// 随机上传占位文件
    pub async fn upload_dummies(&self, files: &[ExpectedFile]) -> Result<Vec<String>> {
        let generator = &self.config.generator;
        DummyUploader::new(
            self.store.as_ref(),
            &self.config.data_folder(),
            generator.dummy_seed,
        )
        .with_content(&generator.dummy_content)
        .with_mode(self.write_mode())
        .upload(files)
        .await
    }

    /// 对账并上传带状态的预期文件清单
    pub async fn reconcile(&self, files: &mut [ExpectedFile]) -> Result<(ReconcileReport, String)> {
        let report = reconcile(self.store.as_ref(), &self.config.data_folder(), files).await?;
        let table = expected_files_table(files);
        let published = self.publish(EXPECTED_FILE, table.to_csv()?).await?;
        Ok((report, published))
    }

    /// 完整运行
    pub async fn run(&self, source: &ExperimentSource) -> Result<RunReport> {
        tracing::info!("Stage 1/4: generating patients and samples");
        let (patients, generated) = self.generate().await?;

        tracing::info!("Stage 2/4: deriving expected files");
        let (experiments, mut files) = self.expected_files(&patients, source).await?;

        tracing::info!("Stage 3/4: uploading dummy files");
        let dummies = self.upload_dummies(&files).await?;

        tracing::info!("Stage 4/4: reconciling uploads");
        let (reconcile, expected_path) = self.reconcile(&mut files).await?;

        let mut published = generated.published;
        published.push(expected_path);
        Ok(RunReport {
            patients: generated.patients,
            samples: generated.samples,
            experiments,
            expected_files: files.len(),
            dummies_uploaded: dummies.len(),
            reconcile,
            published,
        })
    }
}

async fn write_local(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

pub fn create_pipeline(config: AppConfig, store: Arc<dyn FileStore>) -> Pipeline {
    Pipeline::new(config, store)
}
