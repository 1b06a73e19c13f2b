//! CSV tables of the Rigetti export.
//!
//! Both files of a backend folder share the columns
//! `va, vb, backend, time, question, dataID, instance, shots, mitigated,
//! qubits_used, wiring`. The counts file continues with one column per
//! bitstring, the win-rate file with `win_rate`.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;
use nlg_core::outcome::decode_bitstring;
use nlg_core::Counts;

use crate::error::{RigettiError, RigettiResult};

/// Columns identifying one circuit execution in both files.
pub const JOIN_KEYS: [&str; 7] = ["va", "vb", "backend", "time", "question", "dataID", "instance"];

/// A CSV file held in memory with its header.
#[derive(Debug, Clone)]
pub struct Table {
    file: String,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> RigettiResult<Self> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let csv_error = |source| RigettiError::Csv {
            file: file.clone(),
            source,
        };

        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Ok(Self {
            file,
            headers,
            rows,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column.
    pub fn column(&self, name: &str) -> RigettiResult<usize> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| RigettiError::MissingColumn {
                file: self.file.clone(),
                column: name.to_string(),
            })
    }

    /// Trimmed cell; empty when the row is short.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(str::trim).unwrap_or_default()
    }

    fn invalid(&self, row: usize, column: &str, value: &str) -> RigettiError {
        RigettiError::InvalidValue {
            file: self.file.clone(),
            row,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// Parse a cell with `parse`, reporting the column on failure.
    pub fn parse<T>(
        &self,
        row: usize,
        column: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> RigettiResult<T> {
        let value = self.cell(row, self.column(column)?);
        parse(value).ok_or_else(|| self.invalid(row, column, value))
    }

    /// Join key of a row.
    pub fn key(&self, row: usize) -> RigettiResult<Vec<String>> {
        JOIN_KEYS
            .iter()
            .map(|k| Ok(self.cell(row, self.column(k)?).to_string()))
            .collect()
    }

    /// Indices of the rows of each `dataID`, ordered by id.
    pub fn group_by(&self, column: &str) -> RigettiResult<Vec<(String, Vec<usize>)>> {
        let idx = self.column(column)?;
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for row in 0..self.rows.len() {
            let id = self.cell(row, idx).to_string();
            let pos = *positions.entry(id.clone()).or_insert_with(|| {
                groups.push((id, Vec::new()));
                groups.len() - 1
            });
            groups[pos].1.push(row);
        }
        groups.sort_by(|(a, _), (b, _)| match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        });
        Ok(groups)
    }

    /// Histogram of a row from its bitstring columns. Empty cells are skipped.
    pub fn counts(&self, row: usize) -> RigettiResult<Counts> {
        let mut counts = Counts::new();
        for (idx, header) in self.headers.iter().enumerate() {
            let header = header.trim();
            if header.is_empty() || !header.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let value = self.cell(row, idx);
            if value.is_empty() || value.eq_ignore_ascii_case("nan") {
                continue;
            }
            let n = parse_count(value).ok_or_else(|| self.invalid(row, header, value))?;
            let outcome = decode_bitstring(header).map_err(|_| self.invalid(row, header, value))?;
            counts.insert(outcome, n);
        }
        Ok(counts)
    }
}

/// Win rates of the second file, keyed like the counts file.
pub fn win_rates_by_key(table: &Table) -> RigettiResult<HashMap<Vec<String>, f64>> {
    let mut win_rates = HashMap::with_capacity(table.len());
    for row in 0..table.len() {
        let win_rate = table.parse(row, "win_rate", |v| v.parse::<f64>().ok())?;
        win_rates.insert(table.key(row)?, win_rate);
    }
    Ok(win_rates)
}

/// Non-negative integer count, tolerating a `.0` suffix.
pub fn parse_count(value: &str) -> Option<u64> {
    if let Ok(n) = value.parse::<u64>() {
        return Some(n);
    }
    let f = value.parse::<f64>().ok()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// `mmddyyyy` date at midnight UTC. A missing leading zero is tolerated.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let value = value.strip_suffix(".0").unwrap_or(value);
    if value.len() > 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{value:0>8}");
    NaiveDate::parse_from_str(&padded, "%m%d%Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlg_core::Outcome;

    const COUNTS: &str = "\
va,vb,backend,time,question,dataID,instance,shots,mitigated,qubits_used,wiring,0000,0110,1111
0,0,Ankaa-2,10012024,vertex,7,0,1000,False,\"[0, 1, 2, 3]\",line,900,,100
0,1,Ankaa-2,10012024,edge,7,0,1000,False,\"[0, 1, 2, 3]\",line,200,800,
1,1,Ankaa-2,9302024,vertex,12,0,1000,False,\"[4, 5, 6, 7]\",line,,,1000.0
";

    fn table(contents: &str) -> (tempfile::TempDir, Table) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g14_raw_counts.csv");
        std::fs::write(&path, contents).unwrap();
        let table = Table::read(&path).unwrap();
        (dir, table)
    }

    #[test]
    fn test_counts_from_bitstring_columns() {
        let (_dir, t) = table(COUNTS);
        let counts = t.counts(0).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&Outcome(0, 0)], 900);
        assert_eq!(counts[&Outcome(3, 3)], 100);

        let counts = t.counts(1).unwrap();
        assert_eq!(counts[&Outcome(2, 1)], 800);

        assert_eq!(t.counts(2).unwrap()[&Outcome(3, 3)], 1000);
    }

    #[test]
    fn test_fractional_count_is_rejected() {
        let (_dir, t) = table(
            "va,vb,backend,time,question,dataID,instance,shots,0000\n0,0,Ankaa-2,10012024,vertex,1,0,10,2.5\n",
        );
        assert!(matches!(t.counts(0), Err(RigettiError::InvalidValue { .. })));
    }

    #[test]
    fn test_group_by_orders_ids_numerically() {
        let (_dir, t) = table(COUNTS);
        let groups = t.group_by("dataID").unwrap();
        let ids: Vec<_> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["7", "12"]);
        assert_eq!(groups[0].1, vec![0, 1]);
    }

    #[test]
    fn test_missing_column() {
        let (_dir, t) = table(COUNTS);
        assert!(matches!(t.column("win_rate"), Err(RigettiError::MissingColumn { .. })));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("10012024").unwrap().to_rfc3339(), "2024-10-01T00:00:00+00:00");
        assert_eq!(parse_date("9302024").unwrap().to_rfc3339(), "2024-09-30T00:00:00+00:00");
        assert!(parse_date("13012024").is_none());
        assert!(parse_date("2024-10-01").is_none());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("0.5"), None);
    }
}
