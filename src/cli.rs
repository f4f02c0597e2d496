//! 命令行定义与输出辅助

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cvisb-dbx",
    version,
    about = "CViSB Dropbox probe and fake-data generator"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        help = "Use an in-memory store instead of Dropbox"
    )]
    pub dry_run: bool,
    #[arg(long, global = true, help = "Config file (default: ./cvisb.toml)")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the account behind the access token
    Account,
    /// List a folder
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Show metadata for a path
    Stat { path: String },
    /// Download a file
    Get {
        path: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Upload a local file
    Put {
        local: PathBuf,
        remote: String,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Create a folder
    Mkdir { path: String },
    /// Create the standard data folders under the root folder
    InitFolders,
    /// Download a public shared link
    FetchLink {
        url: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate and publish the patient roster and sample list
    Generate {
        #[arg(long)]
        patients: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Upload dummy files for a random subset of expected files
    UploadDummies {
        #[arg(long, help = "Local experiment list instead of the one in Dropbox")]
        expt_file: Option<PathBuf>,
    },
    /// Compare expected files with what is in Dropbox
    Reconcile {
        #[arg(long, help = "Local experiment list instead of the one in Dropbox")]
        expt_file: Option<PathBuf>,
    },
    /// Run every stage end to end
    Run {
        #[arg(long)]
        patients: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, help = "Local experiment list instead of the one in Dropbox")]
        expt_file: Option<PathBuf>,
    },
}

impl Commands {
    /// 不需要访问令牌的命令
    pub fn is_offline(&self) -> bool {
        matches!(self, Commands::FetchLink { .. })
    }

    /// 绕过存储层直接发请求的命令，`--dry-run` 下拒绝执行
    pub fn bypasses_store(&self) -> bool {
        matches!(self, Commands::FetchLink { .. })
    }
}

/// 下载内容是否写出：指定 `--out` 时总是写文件；
/// 未指定时写到 stdout，但 JSON 模式下 stdout 只留给元数据
pub fn writes_payload(json: bool, out: &Option<PathBuf>) -> bool {
    out.is_some() || !json
}

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}
