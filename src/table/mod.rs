//! 表格数据模块
//!
//! 内存中的表以带 serde 派生的记录切片表示；本模块负责与 CSV / XLSX
//! 之间的转换，以及列表列到长格式的展开。

pub mod codec;
pub mod list_cell;
pub mod long_format;

pub use codec::{Table, from_csv, to_csv};
pub use long_format::{explode, explode_str, is_null_cell, split_list};
