//! cvisb-dbx - CViSB Dropbox 原型工具
//!
//! 探测 Dropbox API v2（账户、目录、上传下载），生成模拟患者/样本/实验数据，
//! 上传占位文件并与预期文件清单对账。

pub mod cli;
pub mod config;
pub mod dropbox;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
pub mod table;
