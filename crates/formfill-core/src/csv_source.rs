//! CSV input: header cleanup, row extraction and column kind inference

use std::collections::HashSet;

use formfill_types::{ColumnDescriptor, ColumnKind, GenerationRow};
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::InputLimits;
use crate::error::CsvError;

const SAMPLE_COUNT: usize = 3;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^[-+]?[$€£₪]?\s*[-+]?\d+(\.\d+)?$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref DATE: Regex = Regex::new(
        r"^(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}/\d{1,2}/\d{2,4}|\d{1,2}\.\d{1,2}\.\d{2,4}|\d{1,2}-\d{1,2}-\d{4})$"
    )
    .unwrap();
}

/// Parsed CSV: column metadata plus one row per non-empty record
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<GenerationRow>,
}

impl CsvTable {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

pub fn parse_csv(bytes: &[u8], limits: &InputLimits) -> Result<CsvTable, CsvError> {
    if bytes.len() > limits.max_csv_bytes {
        return Err(CsvError::TooLarge {
            size: bytes.len(),
            limit: limits.max_csv_bytes,
        });
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let header_record = match records.next() {
        Some(record) => record?,
        None => return Err(CsvError::Empty),
    };
    let headers = clean_headers(header_record.iter());
    if headers.is_empty() {
        return Err(CsvError::Empty);
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if rows.len() == limits.max_rows {
            return Err(CsvError::TooManyRows {
                limit: limits.max_rows,
            });
        }
        let row: GenerationRow = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }

    let columns = headers
        .iter()
        .map(|name| {
            let values: Vec<&str> = rows
                .iter()
                .filter_map(|row| row.get(name))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect();
            ColumnDescriptor {
                column_id: name.clone(),
                name: name.clone(),
                kind: infer_kind(&values),
                samples: values.iter().take(SAMPLE_COUNT).map(|v| v.to_string()).collect(),
            }
        })
        .collect();

    tracing::debug!(columns = headers.len(), rows = rows.len(), "Parsed CSV");

    Ok(CsvTable { columns, rows })
}

/// Trim names, name blanks `Column_<n>`, suffix duplicates `_<n>`
fn clean_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for (i, name) in raw.enumerate() {
        let base = match name.trim() {
            "" => format!("Column_{}", i + 1),
            trimmed => trimmed.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        headers.push(candidate);
    }
    headers
}

/// Classify a column from its non-empty values
pub fn infer_kind(values: &[&str]) -> ColumnKind {
    if values.is_empty() {
        return ColumnKind::Text;
    }
    if values.iter().all(|v| NUMBER.is_match(&v.replace(',', ""))) {
        ColumnKind::Number
    } else if values.iter().all(|v| EMAIL.is_match(v)) {
        ColumnKind::Email
    } else if values.iter().all(|v| DATE.is_match(v)) {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> CsvTable {
        parse_csv(text.as_bytes(), &InputLimits::default()).unwrap()
    }

    #[test]
    fn test_basic_rows() {
        let table = parse("Customer,Total\nAcme Inc.,42\nGlobex,7\n");
        assert_eq!(table.headers(), vec!["Customer", "Total"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Customer"), Some("Acme Inc."));
        assert_eq!(table.rows[1].get("Total"), Some("7"));
    }

    #[test]
    fn test_bom_and_header_cleanup() {
        let table = parse("\u{FEFF} Name ,,Name,Name\na,b,c,d\n");
        assert_eq!(table.headers(), vec!["Name", "Column_2", "Name_2", "Name_3"]);
        assert_eq!(table.rows[0].get("Name_3"), Some("d"));
    }

    #[test]
    fn test_ragged_and_empty_rows() {
        let table = parse("a,b,c\n1\n,,\n\n4,5,6,7\n");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("b"), Some(""));
        assert_eq!(table.rows[0].get("c"), Some(""));
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_quoted_hebrew_cells() {
        let table = parse("שם,הערה\n\"כהן, דוד\",\"שורה\nשנייה\"\n");
        assert_eq!(table.rows[0].get("שם"), Some("כהן, דוד"));
        assert_eq!(table.rows[0].get("הערה"), Some("שורה\nשנייה"));
    }

    #[test]
    fn test_empty_input() {
        let result = parse_csv(b"", &InputLimits::default());
        assert!(matches!(result, Err(CsvError::Empty)));
    }

    #[test]
    fn test_limits() {
        let limits = InputLimits {
            max_rows: 2,
            ..InputLimits::default()
        };
        let result = parse_csv(b"a\n1\n2\n3\n", &limits);
        assert!(matches!(result, Err(CsvError::TooManyRows { limit: 2 })));
        assert!(parse_csv(b"a\n1\n2\n", &limits).is_ok());

        let tiny = InputLimits {
            max_csv_bytes: 4,
            ..InputLimits::default()
        };
        assert!(matches!(
            parse_csv(b"a,b\n1,2\n", &tiny),
            Err(CsvError::TooLarge { size: 8, limit: 4 })
        ));
    }

    #[test]
    fn test_column_kinds() {
        let table = parse(
            "amount,email,date,note,blank\n\
             \"1,200.50\",a@b.co,2024-05-01,hello,\n\
             $7,x.y@example.org,01/02/2024,42,\n",
        );
        let kinds: Vec<ColumnKind> = table.columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Number,
                ColumnKind::Email,
                ColumnKind::Date,
                ColumnKind::Text,
                ColumnKind::Text
            ]
        );
        assert_eq!(table.columns[0].samples, vec!["1,200.50", "$7"]);
        assert!(table.columns[4].samples.is_empty());
    }

    #[test]
    fn test_infer_kind_other_date_shapes() {
        assert_eq!(infer_kind(&["31.12.2023", "05-01-2024"]), ColumnKind::Date);
        assert_eq!(infer_kind(&["-3", "+4.5", "₪100"]), ColumnKind::Number);
        assert_eq!(infer_kind(&["12", "abc"]), ColumnKind::Text);
    }
}
