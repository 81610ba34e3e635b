//! CSV ingestion and cleaning.
//!
//! Loads the weekly teaching records table and applies the cleaning rules:
//! rows with an unparseable week are dropped, every malformed or missing
//! numeric cell degrades to zero, and an input with no surviving rows is a
//! fatal [`AnalysisError::Data`].

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, warn};

use crate::config::ColumnConfig;
use crate::error::AnalysisError;
use crate::models::TeachingRecord;

/// Date formats accepted for the week column. Exports either carry a plain
/// date or a midnight timestamp; anything else drops the row.
const WEEK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const WEEK_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The cleaned table plus ingest bookkeeping.
#[derive(Debug)]
pub struct LoadedTable {
    /// Rows that survived cleaning.
    pub records: Vec<TeachingRecord>,
    /// Data rows read from the file before cleaning.
    pub raw_rows: usize,
    /// Rows dropped for an unparseable week value.
    pub dropped_rows: usize,
}

/// Resolved positions of the semantic columns within the CSV header.
///
/// The key columns must exist; the numeric columns may be absent, in which
/// case their values are zero for every row.
struct ColumnIndices {
    week: usize,
    class_name: usize,
    subject: usize,
    hours: Option<usize>,
    attendance_rate: Option<usize>,
    micro_completion_rate: Option<usize>,
    correctness_rate: Option<usize>,
}

impl ColumnIndices {
    fn resolve(headers: &StringRecord, columns: &ColumnConfig) -> Result<Self, AnalysisError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            week: require(&columns.week)?,
            class_name: require(&columns.class_name)?,
            subject: require(&columns.subject)?,
            hours: find(&columns.hours),
            attendance_rate: find(&columns.attendance_rate),
            micro_completion_rate: find(&columns.micro_completion_rate),
            correctness_rate: find(&columns.correctness_rate),
        })
    }
}

/// Load and clean the records table.
pub fn load_records(path: &Path, columns: &ColumnConfig) -> Result<LoadedTable, AnalysisError> {
    let source_read = |source: csv::Error| AnalysisError::SourceRead {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(source_read)?;

    let headers = reader.headers().map_err(source_read)?.clone();
    let indices = ColumnIndices::resolve(&headers, columns)?;

    let mut records = Vec::new();
    let mut raw_rows = 0usize;
    let mut dropped_rows = 0usize;

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable row: {}", e);
                dropped_rows += 1;
                raw_rows += 1;
                continue;
            }
        };
        raw_rows += 1;

        let Some(week) = parse_week(row.get(indices.week).unwrap_or("")) else {
            debug!("Dropping row {} with unparseable week", raw_rows);
            dropped_rows += 1;
            continue;
        };

        records.push(TeachingRecord {
            week,
            class_name: field(&row, indices.class_name),
            subject: field(&row, indices.subject),
            hours: numeric(&row, indices.hours),
            attendance_rate: numeric(&row, indices.attendance_rate),
            micro_completion_rate: numeric(&row, indices.micro_completion_rate),
            correctness_rate: numeric(&row, indices.correctness_rate),
        });
    }

    if records.is_empty() {
        return Err(AnalysisError::Data(format!(
            "none of the {} data rows in {} carried a parseable week",
            raw_rows,
            path.display()
        )));
    }

    debug!(
        "Loaded {} rows from {} ({} dropped)",
        records.len(),
        path.display(),
        dropped_rows
    );

    Ok(LoadedTable {
        records,
        raw_rows,
        dropped_rows,
    })
}

/// Parse the week cell. Returns None when the value is empty or matches no
/// accepted format.
fn parse_week(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for format in WEEK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    NaiveDateTime::parse_from_str(value, WEEK_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.date())
}

/// A text field; absent cells become the empty string.
fn field(row: &StringRecord, index: usize) -> String {
    row.get(index).unwrap_or("").trim().to_string()
}

/// A numeric field; absent, empty, and non-numeric cells become 0.
fn numeric(row: &StringRecord, index: Option<usize>) -> f64 {
    index
        .and_then(|i| row.get(i))
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_loads_and_cleans_rows() {
        let file = write_csv(
            "week,class_name,subject,hours,attendance_rate,micro_completion_rate,correctness_rate,notes\n\
             2025-09-01,Class A,Math,10,0.9,0.5,0.4,ignored\n\
             2025-09-01,Class B,Physics,8.5,0.8,,bad,also ignored\n",
        );

        let table = load_records(file.path(), &ColumnConfig::default()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.raw_rows, 2);
        assert_eq!(table.dropped_rows, 0);

        let first = &table.records[0];
        assert_eq!(first.class_name, "Class A");
        assert_eq!(first.hours, 10.0);
        assert_eq!(first.correctness_rate, 0.4);

        // Empty and non-numeric cells coerce to zero, not an error
        let second = &table.records[1];
        assert_eq!(second.micro_completion_rate, 0.0);
        assert_eq!(second.correctness_rate, 0.0);
        assert_eq!(second.hours, 8.5);
    }

    #[test]
    fn test_drops_rows_with_bad_week() {
        let file = write_csv(
            "week,class_name,subject,hours,attendance_rate,micro_completion_rate,correctness_rate\n\
             not-a-date,Class A,Math,10,0.9,0.5,0.4\n\
             2025-09-08,Class A,Math,6,0.9,0.5,0.4\n\
             ,Class B,Math,4,0.9,0.5,0.4\n",
        );

        let table = load_records(file.path(), &ColumnConfig::default()).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.dropped_rows, 2);
        assert_eq!(
            table.records[0].week,
            NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()
        );
    }

    #[test]
    fn test_accepts_slash_dates_and_timestamps() {
        let file = write_csv(
            "week,class_name,subject,hours,attendance_rate,micro_completion_rate,correctness_rate\n\
             2025/09/01,Class A,Math,10,0.9,0.5,0.4\n\
             2025-09-08 00:00:00,Class A,Math,6,0.9,0.5,0.4\n",
        );

        let table = load_records(file.path(), &ColumnConfig::default()).unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(
            table.records[0].week,
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
        );
        assert_eq!(
            table.records[1].week,
            NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()
        );
    }

    #[test]
    fn test_all_bad_weeks_is_a_data_error() {
        let file = write_csv(
            "week,class_name,subject,hours,attendance_rate,micro_completion_rate,correctness_rate\n\
             soon,Class A,Math,10,0.9,0.5,0.4\n\
             later,Class B,Math,4,0.9,0.5,0.4\n",
        );

        let err = load_records(file.path(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Data(_)));
    }

    #[test]
    fn test_missing_key_column_is_fatal() {
        let file = write_csv("when,class_name,subject\n2025-09-01,Class A,Math\n");

        let err = load_records(file.path(), &ColumnConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn(name) if name == "week"));
    }

    #[test]
    fn test_missing_numeric_column_degrades_to_zero() {
        let file = write_csv(
            "week,class_name,subject\n\
             2025-09-01,Class A,Math\n",
        );

        let table = load_records(file.path(), &ColumnConfig::default()).unwrap();
        assert_eq!(table.records[0].hours, 0.0);
        assert_eq!(table.records[0].attendance_rate, 0.0);
    }

    #[test]
    fn test_missing_file_is_a_source_read_error() {
        let err = load_records(
            Path::new("/no/such/records.csv"),
            &ColumnConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::SourceRead { .. }));
    }

    #[test]
    fn test_remapped_columns() {
        let columns = ColumnConfig {
            week: "周".to_string(),
            class_name: "班级名称".to_string(),
            subject: "课时学科".to_string(),
            hours: "课时数".to_string(),
            attendance_rate: "课时平均出勤率".to_string(),
            micro_completion_rate: "微课完成率".to_string(),
            correctness_rate: "题目正确率（自学+快背）".to_string(),
        };
        let file = write_csv(
            "周,班级名称,课时学科,课时数,课时平均出勤率,微课完成率,题目正确率（自学+快背）\n\
             2025-09-01,高二3班,数学,12,0.95,0.6,0.35\n",
        );

        let table = load_records(file.path(), &columns).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].class_name, "高二3班");
        assert_eq!(table.records[0].hours, 12.0);
    }
}
