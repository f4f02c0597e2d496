//! 错误处理模块
//!
//! 定义应用程序的错误类型以及 Dropbox API 错误到 [`AppError`] 的映射。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 认证错误（令牌缺失或失效）
    #[error("认证失败: {0}")]
    Authentication(String),

    /// 路径不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 路径冲突，例如以 add 模式上传已存在的文件
    #[error("路径冲突: {0}")]
    Conflict(String),

    /// 速率限制（不重试）
    #[error("请求过于频繁，请稍后再试")]
    RateLimited,

    /// 单次上传超过大小上限
    #[error("文件过大: {size} 字节，单次上传上限 {limit} 字节")]
    PayloadTooLarge { size: usize, limit: usize },

    /// 其它 API 错误
    #[error("Dropbox API 错误 ({status}): {body}")]
    Api { status: u16, body: String },

    /// HTTP 传输错误
    #[error("HTTP 错误: {0}")]
    Http(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 表格读写错误 (CSV / XLSX)
    #[error("表格错误: {0}")]
    Table(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Http(e.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Table(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Table(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// Dropbox 错误响应体
///
/// 409 响应中 `error_summary` 形如 `path/not_found/..`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxErrorBody {
    /// 错误摘要
    pub error_summary: String,
    /// 结构化错误详情
    #[serde(default)]
    pub error: serde_json::Value,
}

impl AppError {
    /// 根据 HTTP 状态码和响应体构造错误
    pub fn from_api_response(status: u16, body: &str) -> Self {
        match status {
            401 => AppError::Authentication(summary_or_body(body)),
            409 => {
                let summary = summary_or_body(body);
                if summary.starts_with("path/not_found") || summary.contains("/not_found") {
                    AppError::NotFound(summary)
                } else {
                    AppError::Conflict(summary)
                }
            }
            429 => AppError::RateLimited,
            _ => AppError::Api {
                status,
                body: body.to_string(),
            },
        }
    }

    /// 是否为“路径不存在”错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

fn summary_or_body(body: &str) -> String {
    serde_json::from_str::<DropboxErrorBody>(body)
        .map(|b| b.error_summary)
        .unwrap_or_else(|_| body.to_string())
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
