//! 可观测性模块
//!
//! 提供结构化日志初始化和运行计数指标。

use std::sync::atomic::{AtomicU64, Ordering};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};

/// 初始化全局 tracing 订阅者
///
/// 过滤级别取配置值，`RUST_LOG` 存在时优先。配置了 `log_dir` 时额外写入按天滚动的
/// 日志文件，返回的 guard 需保持存活直到进程退出。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Config(format!("无效的日志级别 '{}': {}", config.level, e)))?;

    let stderr_layer = if config.structured {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cvisb-dbx.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("日志初始化失败: {}", e)))?;

    Ok(guard)
}

/// 运行指标
#[derive(Debug, Default)]
pub struct RunMetrics {
    pub api_calls_total: AtomicU64,
    pub uploads_total: AtomicU64,
    pub bytes_uploaded: AtomicU64,
    pub downloads_total: AtomicU64,
    pub bytes_downloaded: AtomicU64,
    pub errors_total: AtomicU64,
}

impl RunMetrics {
    /// 记录一次 API 调用
    pub fn record_api_call(&self) {
        self.api_calls_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录上传
    pub fn record_upload(&self, bytes: usize) {
        self.uploads_total.fetch_add(1, Ordering::SeqCst);
        self.bytes_uploaded
            .fetch_add(bytes as u64, Ordering::SeqCst);
    }

    /// 记录下载
    pub fn record_download(&self, bytes: usize) {
        self.downloads_total.fetch_add(1, Ordering::SeqCst);
        self.bytes_downloaded
            .fetch_add(bytes as u64, Ordering::SeqCst);
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成文本摘要
    pub fn gather(&self) -> String {
        format!(
            "api_calls_total {}\n\
             uploads_total {}\n\
             bytes_uploaded {}\n\
             downloads_total {}\n\
             bytes_downloaded {}\n\
             errors_total {}\n",
            self.api_calls_total.load(Ordering::SeqCst),
            self.uploads_total.load(Ordering::SeqCst),
            self.bytes_uploaded.load(Ordering::SeqCst),
            self.downloads_total.load(Ordering::SeqCst),
            self.bytes_downloaded.load(Ordering::SeqCst),
            self.errors_total.load(Ordering::SeqCst),
        )
    }
}
