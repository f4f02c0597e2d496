//! CSV / XLSX 编解码

use rust_xlsxwriter::Workbook;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

/// 序列化记录为 CSV（带表头）
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Table(e.to_string()))
}

/// 从 CSV 反序列化记录
pub fn from_csv<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// 无类型的字符串表
///
/// 用于列集合在运行时才确定的表（实验列表的附加列），以及 XLSX 导出。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// 追加一行，长度不足时以空串补齐
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// 列下标
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 由带类型的记录构造
    pub fn from_records<T: Serialize>(rows: &[T]) -> Result<Self> {
        if rows.is_empty() {
            return Ok(Self::default());
        }
        Self::parse_csv(&to_csv(rows)?)
    }

    /// 解析 CSV（所有单元格按字符串读取）
    pub fn parse_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(str::to_string).collect());
        }
        Ok(table)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Table(e.to_string()))
    }

    /// 导出为单工作表 XLSX，数值单元格按数字写入
    pub fn to_xlsx(&self, sheet_name: &str) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, header.as_str())?;
        }
        for (i, row) in self.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell.parse::<f64>() {
                    Ok(n) if n.is_finite() => {
                        worksheet.write_number(r, col as u16, n)?;
                    }
                    _ if cell.is_empty() => {}
                    _ => {
                        worksheet.write_string(r, col as u16, cell.as_str())?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        a: i32,
        b: Option<String>,
    }

    #[test]
    fn test_csv_layout() {
        let rows = vec![
            Row { a: 1, b: Some("x".into()) },
            Row { a: 2, b: None },
        ];
        let bytes = to_csv(&rows).unwrap();
        assert_eq!(String::from_utf8(bytes.clone()).unwrap(), "a,b\n1,x\n2,\n");
        let back: Vec<Row> = from_csv(&bytes).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_table_from_records() {
        let rows = vec![Row { a: 10, b: None }];
        let table = Table::from_records(&rows).unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["10".to_string(), String::new()]]);
        assert_eq!(table.column("b"), Some(1));
    }

    #[test]
    fn test_parse_csv_pads_short_rows() {
        let table = Table::parse_csv(b"x, y,z\n1,2\n").unwrap();
        assert_eq!(table.headers, vec!["x", "y", "z"]);
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_xlsx_is_zip() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(vec!["1".into(), "two".into()]);
        let bytes = table.to_xlsx("raw_data").unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
