//! 占位文件上传
//!
//! 为每个患者随机挑选部分预期文件，以占位内容写入 Dropbox，模拟“部分数据已到位”。

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::dropbox::types::WriteMode;
use crate::dropbox::{FileStore, join_path};
use crate::error::Result;
use crate::models::experiment::ExpectedFile;

/// 默认占位文件内容
pub const DUMMY_CONTENT: &str = "This is not a real file.";

/// 默认随机种子
pub const DUMMY_SEED: u64 = 20180316;

/// 按患者首次出现的顺序分组，返回 `(patient_id, 行下标)`
pub fn group_by_patient(files: &[ExpectedFile]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, file) in files.iter().enumerate() {
        match groups.iter_mut().find(|(id, _)| *id == file.patient_id) {
            Some((_, rows)) => rows.push(i),
            None => groups.push((file.patient_id.clone(), vec![i])),
        }
    }
    groups
}

/// 随机挑选每个患者要生成的文件（返回 `files` 中的下标）
///
/// 每个患者挑选 `k` 个不重复的行，`k` 在 `[1, n)` 中均匀抽取；只有一行时 `k = 1`。
pub fn select_files<R: Rng + ?Sized>(files: &[ExpectedFile], rng: &mut R) -> Vec<usize> {
    let mut selected = Vec::new();
    for (patient_id, rows) in group_by_patient(files) {
        let n = rows.len();
        let k = if n > 1 { rng.random_range(1..n) } else { n };
        let picks = index::sample(rng, n, k);
        tracing::debug!("Patient {}: {} of {} files selected", patient_id, k, n);
        selected.extend(picks.iter().map(|i| rows[i]));
    }
    selected
}

/// 上传路径：实验目录 + 文件名，实验未指定目录时使用 `default_folder`
pub fn upload_path(file: &ExpectedFile, default_folder: &str) -> String {
    let folder = file
        .dropbox
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(default_folder);
    join_path(folder, &file.filename)
}

/// 占位文件上传器
pub struct DummyUploader<'a> {
    store: &'a dyn FileStore,
    content: Vec<u8>,
    default_folder: String,
    mode: WriteMode,
    rng: StdRng,
}

impl<'a> DummyUploader<'a> {
    pub fn new(store: &'a dyn FileStore, default_folder: &str, seed: u64) -> Self {
        Self {
            store,
            content: DUMMY_CONTENT.as_bytes().to_vec(),
            default_folder: default_folder.to_string(),
            mode: WriteMode::Overwrite,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.as_bytes().to_vec();
        self
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// 挑选并上传，返回已上传的路径（不重复）
    ///
    /// 多个参数值的行共用同一文件名，同一路径只上传一次。
    pub async fn upload(&mut self, files: &[ExpectedFile]) -> Result<Vec<String>> {
        let selected = select_files(files, &mut self.rng);
        tracing::info!(
            "Uploading {} dummy files ({} expected)",
            selected.len(),
            files.len()
        );

        let mut seen = HashSet::with_capacity(selected.len());
        let mut uploaded = Vec::with_capacity(selected.len());
        for i in selected {
            let path = upload_path(&files[i], &self.default_folder);
            if !seen.insert(path.clone()) {
                tracing::debug!("Skipping repeated path {}", path);
                continue;
            }
            self.store
                .upload(self.content.clone(), &path, self.mode)
                .await?;
            uploaded.push(path);
        }
        Ok(uploaded)
    }
}
