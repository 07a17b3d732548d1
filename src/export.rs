//! Export of the grid's current filtered+sorted rows.
//!
//! CSV is synthesized locally. Only values containing a comma are quoted;
//! embedded quotes and newlines are written as-is and will produce malformed
//! CSV. The spreadsheet format is generated by the service.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::model::{value_text, Record};
use crate::service::{AnalyticsService, ServiceError};

pub const SAMPLE_FILE_NAME: &str = "Sample_Dataset.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Spreadsheet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Spreadsheet => "xlsx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Spreadsheet => "Excel",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to download")]
    NoData,
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to generate Excel file: {0}")]
    Service(#[from] ServiceError),
}

/// Distinct non-empty values of the `area` column (key matched case-insensitively), first-seen order.
pub fn distinct_areas(rows: &[Record]) -> Vec<String> {
    let mut areas: Vec<String> = Vec::new();
    for row in rows {
        let area = row
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("area"))
            .map(|(_, v)| value_text(v))
            .filter(|a| !a.is_empty());
        if let Some(area) = area {
            if !areas.contains(&area) {
                areas.push(area);
            }
        }
    }
    areas
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    out
}

/// `<area>_<date>.<ext>`, `<n>_areas_comparison_<date>.<ext>` or `analysis_results_<date>.<ext>`.
pub fn export_filename(rows: &[Record], format: ExportFormat, date: NaiveDate) -> String {
    let areas = distinct_areas(rows);
    let stem = match areas.len() {
        0 => "analysis_results".to_string(),
        1 => slugify(&areas[0]),
        n => format!("{}_areas_comparison", n),
    };
    format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), format.extension())
}

fn csv_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if s.contains(',') => format!("\"{}\"", s),
        Some(v) => value_text(v),
        None => String::new(),
    }
}

/// Header from the first record's keys, one line per row, `\n` separated.
pub fn render_csv(rows: &[Record]) -> String {
    let headers: Vec<&String> = match rows.first() {
        Some(first) => first.keys().collect(),
        None => return String::new(),
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let fields: Vec<String> = headers.iter().map(|h| csv_field(row.get(*h))).collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

pub fn save_download(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let path = dir.join(filename);
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Writes `rows` to `dir` in `format`. Empty input fails before any I/O.
pub fn export_rows(
    rows: &[Record],
    format: ExportFormat,
    service: &dyn AnalyticsService,
    dir: &Path,
    today: NaiveDate,
) -> Result<PathBuf, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NoData);
    }

    let filename = export_filename(rows, format, today);
    let bytes = match format {
        ExportFormat::Csv => render_csv(rows).into_bytes(),
        ExportFormat::Spreadsheet => service.generate_spreadsheet(rows)?,
    };

    let path = save_download(dir, &filename, &bytes)?;
    log::info!("exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

pub fn save_sample(service: &dyn AnalyticsService, dir: &Path) -> Result<PathBuf, ExportError> {
    let bytes = service.download_sample()?;
    save_download(dir, SAMPLE_FILE_NAME, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HealthStatus, ResultSet, UploadReceipt};
    use crate::upload::UploadFile;
    use serde_json::json;
    use std::sync::Mutex;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[derive(Default)]
    struct FakeService {
        spreadsheet: Option<Vec<u8>>,
        received: Mutex<Vec<Record>>,
    }

    impl AnalyticsService for FakeService {
        fn submit_query(&self, _: &str) -> Result<ResultSet, ServiceError> {
            unreachable!()
        }
        fn upload_dataset(&self, _: &UploadFile) -> Result<UploadReceipt, ServiceError> {
            unreachable!()
        }
        fn list_areas(&self) -> Result<Vec<String>, ServiceError> {
            unreachable!()
        }
        fn health(&self) -> Result<HealthStatus, ServiceError> {
            unreachable!()
        }
        fn download_sample(&self) -> Result<Vec<u8>, ServiceError> {
            Ok(b"sample".to_vec())
        }
        fn generate_spreadsheet(&self, rows: &[Record]) -> Result<Vec<u8>, ServiceError> {
            self.received.lock().unwrap().extend(rows.iter().cloned());
            self.spreadsheet
                .clone()
                .ok_or_else(|| ServiceError::Http(500, "boom".into()))
        }
    }

    #[test]
    fn filename_for_single_area() {
        let rows = vec![
            record(json!({"area": "Ambegaon  Budruk", "year": 2023})),
            record(json!({"area": "Ambegaon  Budruk", "year": 2022})),
        ];
        assert_eq!(
            export_filename(&rows, ExportFormat::Csv, date()),
            "ambegaon_budruk_2024-03-09.csv"
        );
    }

    #[test]
    fn filename_for_several_areas_and_capitalized_key() {
        let rows = vec![
            record(json!({"Area": "Wakad"})),
            record(json!({"Area": "Aundh"})),
            record(json!({"Area": "Wakad"})),
        ];
        assert_eq!(
            export_filename(&rows, ExportFormat::Spreadsheet, date()),
            "2_areas_comparison_2024-03-09.xlsx"
        );
    }

    #[test]
    fn filename_without_area_column() {
        let rows = vec![record(json!({"year": 2023, "price": 1}))];
        assert_eq!(
            export_filename(&rows, ExportFormat::Csv, date()),
            "analysis_results_2024-03-09.csv"
        );
    }

    #[test]
    fn csv_quotes_only_commas() {
        let rows = vec![
            record(json!({"year": 2023, "area": "Wakad, Pune", "price": 9000000.0, "demand": 7.2})),
            record(json!({"year": 2022, "area": "Say \"hi\"", "price": null})),
        ];
        assert_eq!(
            render_csv(&rows),
            "year,area,price,demand\n2023,\"Wakad, Pune\",9000000,7.2\n2022,Say \"hi\",,"
        );
    }

    #[test]
    fn no_data_performs_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never");
        let service = FakeService::default();
        let err = export_rows(&[], ExportFormat::Csv, &service, &target, date()).unwrap_err();
        assert!(matches!(err, ExportError::NoData));
        assert!(!target.exists());
    }

    #[test]
    fn csv_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![record(json!({"area": "Wakad", "year": 2023}))];
        let service = FakeService::default();
        let path = export_rows(&rows, ExportFormat::Csv, &service, dir.path(), date()).unwrap();
        assert_eq!(path.file_name().unwrap(), "wakad_2024-03-09.csv");
        assert_eq!(fs::read_to_string(path).unwrap(), "area,year\nWakad,2023");
    }

    #[test]
    fn spreadsheet_export_sends_rows_and_saves_payload() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            record(json!({"area": "Wakad", "year": 2023})),
            record(json!({"area": "Wakad", "year": 2022})),
        ];
        let service = FakeService {
            spreadsheet: Some(b"PK\x03\x04".to_vec()),
            ..Default::default()
        };
        let path =
            export_rows(&rows, ExportFormat::Spreadsheet, &service, dir.path(), date()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"PK\x03\x04");
        assert_eq!(*service.received.lock().unwrap(), rows);
    }

    #[test]
    fn spreadsheet_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![record(json!({"area": "Wakad"}))];
        let service = FakeService::default();
        let err =
            export_rows(&rows, ExportFormat::Spreadsheet, &service, dir.path(), date()).unwrap_err();
        assert!(matches!(err, ExportError::Service(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn sample_is_saved_under_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_sample(&FakeService::default(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), SAMPLE_FILE_NAME);
        assert_eq!(fs::read(path).unwrap(), b"sample");
    }
}
