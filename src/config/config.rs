use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dropbox 连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxConfig {
    /// OAuth 访问令牌
    pub token: String,
    /// RPC 端点地址
    pub api_url: String,
    /// 内容上传/下载端点地址
    pub content_url: String,
    /// 项目根目录
    pub root_folder: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://api.dropboxapi.com".into(),
            content_url: "https://content.dropboxapi.com".into(),
            root_folder: "/CViSB_test".into(),
            timeout_secs: 60,
        }
    }
}

/// 模拟数据生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 生成的患者数量
    pub patients: usize,
    /// 患者生成随机种子（为空时使用系统熵）
    pub seed: Option<u64>,
    /// 实验列表文件名（相对于根目录）
    pub expt_file: String,
    /// 占位文件上传随机种子
    pub dummy_seed: u64,
    /// 占位文件内容
    pub dummy_content: String,
    /// 是否同时上传 XLSX 版本的患者名册
    pub write_xlsx: bool,
    /// 本地输出目录
    pub output_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            patients: 25,
            seed: None,
            expt_file: "expt_list.csv".into(),
            dummy_seed: 20180316,
            dummy_content: "This is not a real file.".into(),
            write_xlsx: false,
            output_dir: None,
        }
    }
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 已存在文件是否覆盖
    pub overwrite: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Dropbox 配置
    pub dropbox: DropboxConfig,
    /// 数据生成配置
    pub generator: GeneratorConfig,
    /// 上传配置
    pub upload: UploadConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 创建开发环境配置（固定种子，调试日志）
    pub fn development() -> Self {
        let mut config = Self::default();
        config.generator.seed = Some(20180316);
        config.logging.level = "debug".into();
        config
    }

    /// 根目录下的路径
    pub fn root_path(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.dropbox.root_folder.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }

    /// 数据目录 `{root}/Data`
    pub fn data_folder(&self) -> String {
        self.root_path("Data")
    }
}
