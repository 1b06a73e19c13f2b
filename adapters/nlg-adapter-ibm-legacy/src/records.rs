//! Rows of the 2023 IBM CSV exports.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use nlg_core::{Counts, Outcome};
use serde::Deserialize;

use crate::error::{LegacyError, LegacyResult};

/// One circuit of `ibm_processed.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessedRow {
    pub job: String,
    pub backend: String,
    pub shots: u64,
    pub time: String,
    pub q_winrate: f64,
    pub va: u32,
    pub vb: u32,
}

/// One outcome of `ibm_results.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    pub va: u32,
    pub vb: u32,
    pub ca: u32,
    pub cb: u32,
    pub n: u64,
}

/// Read every row of a CSV file.
pub fn read_csv<T: serde::de::DeserializeOwned>(path: &Path) -> LegacyResult<Vec<T>> {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let csv_err = |source: csv::Error| LegacyError::Csv {
        file: file.clone(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)
}

/// Rows grouped by job id, jobs in sorted order.
pub fn group_by_job(rows: Vec<ProcessedRow>) -> BTreeMap<String, Vec<ProcessedRow>> {
    let mut jobs: BTreeMap<String, Vec<ProcessedRow>> = BTreeMap::new();
    for row in rows {
        jobs.entry(row.job.clone()).or_default().push(row);
    }
    jobs
}

/// Histograms of every question. A repeated outcome keeps the last count.
pub fn counts_by_question(rows: Vec<RawRow>) -> BTreeMap<(u32, u32), Counts> {
    let mut questions: BTreeMap<(u32, u32), Counts> = BTreeMap::new();
    for row in rows {
        questions
            .entry((row.va, row.vb))
            .or_default()
            .insert(Outcome(row.ca, row.cb), row.n);
    }
    questions
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_time(job: &str, value: &str) -> LegacyResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(t) = DateTime::parse_from_str(value, fmt) {
            return Ok(t.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(t.and_utc());
        }
    }
    if let Some(t) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(t.and_utc());
    }

    Err(LegacyError::InvalidTime {
        job: job.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        let expected = "2023-06-14T10:33:20+00:00";
        for value in [
            "2023-06-14T10:33:20Z",
            "2023-06-14 10:33:20+00:00",
            "2023-06-14T12:33:20+02:00",
            "2023-06-14T10:33:20",
            "2023-06-14 10:33:20.000",
        ] {
            assert_eq!(parse_time("j", value).unwrap().to_rfc3339(), expected, "{value}");
        }
        assert_eq!(
            parse_time("j", "2023-06-14").unwrap().to_rfc3339(),
            "2023-06-14T00:00:00+00:00"
        );
        assert!(parse_time("j", "June 14").is_err());
    }

    #[test]
    fn test_counts_last_row_wins() {
        let rows = vec![
            RawRow { va: 0, vb: 1, ca: 2, cb: 3, n: 5 },
            RawRow { va: 0, vb: 1, ca: 2, cb: 3, n: 7 },
            RawRow { va: 1, vb: 1, ca: 0, cb: 0, n: 9 },
        ];
        let counts = counts_by_question(rows);
        assert_eq!(counts[&(0, 1)][&Outcome(2, 3)], 7);
        assert_eq!(counts[&(1, 1)].len(), 1);
    }
}
