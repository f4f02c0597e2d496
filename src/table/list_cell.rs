//! 列表列的单元格编码
//!
//! CSV 不支持嵌套序列，列表列以 `[0, 1, 2]` 的形式写入单个单元格。
//! 读取时方括号可省略，元素以逗号分隔。

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use std::fmt::Display;
use std::str::FromStr;

pub fn serialize<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    serializer.serialize_str(&format_list(values))
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    parse_list(&raw).map_err(D::Error::custom)
}

/// 格式化为 `[a, b, c]`
pub fn format_list<T: Display>(values: &[T]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// 解析 `[a, b, c]` 或 `a, b, c`
pub fn parse_list<T>(raw: &str) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| format!("无法解析列表元素 '{}': {}", s, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_list() {
        assert_eq!(format_list(&[0u32, 1, 2]), "[0, 1, 2]");
        assert_eq!(format_list::<u32>(&[]), "[]");
    }

    #[test]
    fn test_parse_list_variants() {
        assert_eq!(parse_list::<u32>("[0, 1, 7]").unwrap(), vec![0, 1, 7]);
        assert_eq!(parse_list::<u32>("0,1,7").unwrap(), vec![0, 1, 7]);
        assert_eq!(parse_list::<u32>("[]").unwrap(), Vec::<u32>::new());
        assert!(parse_list::<u32>("[0, x]").is_err());
    }
}
