//! 长格式展开
//!
//! 将“一行一个实体、列中存放列表”的表展开为“一行一个 (实体, 元素)”。
//! 空单元格整行丢弃，不会产生空元素。

/// 单元格是否视为缺失值
pub fn is_null_cell(raw: &str) -> bool {
    matches!(raw.trim(), "" | "NA" | "NaN" | "nan" | "null" | "None")
}

/// 拆分逗号分隔的列表单元格（`", "` 与 `","` 等价）
pub fn split_list(raw: &str) -> Vec<String> {
    if is_null_cell(raw) {
        return Vec::new();
    }
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '\'' || c == '"'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 展开已解析的列表列
pub fn explode<K, T, I>(rows: I) -> Vec<(K, T)>
where
    K: Clone,
    I: IntoIterator<Item = (K, Option<Vec<T>>)>,
{
    rows.into_iter()
        .filter_map(|(key, values)| values.map(|v| (key, v)))
        .flat_map(|(key, values)| values.into_iter().map(move |v| (key.clone(), v)))
        .collect()
}

/// 展开字符串形式的列表列
pub fn explode_str<'a, K, I>(rows: I) -> Vec<(K, String)>
where
    K: Clone,
    I: IntoIterator<Item = (K, Option<&'a str>)>,
{
    explode(
        rows.into_iter()
            .map(|(key, raw)| (key, raw.map(split_list))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1, 2, 3", vec!["1", "2", "3"])]
    #[case("1,2,3", vec!["1", "2", "3"])]
    #[case(".csv, .fcs", vec![".csv", ".fcs"])]
    #[case("[0, 1]", vec!["0", "1"])]
    #[case("7", vec!["7"])]
    #[case("a,,b, ", vec!["a", "b"])]
    #[case("", vec![])]
    #[case("NaN", vec![])]
    fn test_split_list(#[case] raw: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_list(raw), expected);
    }

    #[test]
    fn test_explode_drops_nulls() {
        let rows = vec![
            ("e1", Some("1, 2")),
            ("e2", None),
            ("e3", Some("")),
            ("e4", Some("4")),
        ];
        let long = explode_str(rows);
        assert_eq!(
            long,
            vec![
                ("e1", "1".to_string()),
                ("e1", "2".to_string()),
                ("e4", "4".to_string()),
            ]
        );
    }

    #[test]
    fn test_explode_numeric() {
        let rows = vec![("p1", Some(vec![0u32, 1])), ("p2", None), ("p3", Some(vec![]))];
        assert_eq!(explode(rows), vec![("p1", 0), ("p1", 1)]);
    }
}
