//! Dataset upload pre-flight checks. Nothing here touches the network.

use std::fs;
use std::path::Path;

use crate::service::ServiceError;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

/// A spreadsheet that passed validation, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn mime_type(&self) -> &'static str {
        if self.file_name.to_lowercase().ends_with(".xls") {
            XLS_MIME
        } else {
            XLSX_MIME
        }
    }
}

pub fn has_spreadsheet_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

/// Validates extension and size, then reads the file.
pub fn prepare_upload(path: &Path) -> Result<UploadFile, ServiceError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !has_spreadsheet_extension(&file_name) {
        return Err(ServiceError::Validation(
            "Please select a valid Excel file (.xlsx or .xls)".into(),
        ));
    }

    let meta = fs::metadata(path)
        .map_err(|e| ServiceError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(ServiceError::Validation(
            "File size must be less than 10MB".into(),
        ));
    }

    let bytes = fs::read(path)
        .map_err(|e| ServiceError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;

    Ok(UploadFile { file_name, bytes })
}

pub fn upload_success_message(area_count: usize) -> String {
    format!(
        "File processed successfully. Loaded {} area{}. Data ready for analysis.",
        area_count,
        if area_count == 1 { "" } else { "s" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_wrong_extension_before_reading() {
        let err = prepare_upload(Path::new("/nonexistent/data.csv")).unwrap_err();
        assert_eq!(err.to_string(), "Please select a valid Excel file (.xlsx or .xls)");
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_spreadsheet_extension("Sample_Data.XLSX"));
        assert!(has_spreadsheet_extension("old.xls"));
        assert!(!has_spreadsheet_extension("data.xlsm"));
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.xlsx");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

        let err = prepare_upload(&path).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 10MB");
    }

    #[test]
    fn accepts_small_spreadsheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("areas.xls");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"fake workbook")
            .unwrap();

        let file = prepare_upload(&path).unwrap();
        assert_eq!(file.file_name, "areas.xls");
        assert_eq!(file.bytes, b"fake workbook");
        assert_eq!(file.mime_type(), "application/vnd.ms-excel");
    }

    #[test]
    fn success_message_pluralizes() {
        assert!(upload_success_message(1).contains("1 area."));
        assert!(upload_success_message(3).contains("3 areas."));
    }
}
