//! Validation for incoming write requests
//!
//! Folder and file names arrive from the UI layer and are untrusted. They are
//! checked before any storage call so a malformed request never touches disk
//! or the storage broker.

use std::path::{Component, Path};

use crate::error::WriteError;
use crate::types::WriteRequest;

// Names Windows resolves to devices regardless of extension
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reject a request whose payload or names are empty or unsafe
pub fn validate_request(request: &WriteRequest) -> Result<(), WriteError> {
    if request.payload.is_empty() {
        return Err(WriteError::InvalidRequest("payload is empty".to_string()));
    }
    validate_folder_name(&request.folder_name)?;
    validate_file_name(&request.file_name)?;
    Ok(())
}

/// Folder names may nest with `/` but every segment must be a plain name
pub fn validate_folder_name(folder_name: &str) -> Result<(), WriteError> {
    if folder_name.trim().is_empty() {
        return Err(WriteError::InvalidRequest("folder name is empty".to_string()));
    }

    if folder_name.starts_with('/') || folder_name.starts_with('~') {
        log::warn!("[Storage] Rejected absolute folder name: {}", folder_name);
        return Err(WriteError::InvalidRequest(
            "folder name must be relative".to_string(),
        ));
    }

    if folder_name.contains('\\') || folder_name.contains('\0') {
        return Err(WriteError::InvalidRequest(
            "folder name contains invalid characters".to_string(),
        ));
    }

    for segment in folder_name.split('/') {
        check_segment(segment, "folder name")?;
    }

    check_encoded_traversal(folder_name, "folder name")
}

/// File names are a single path component
pub fn validate_file_name(file_name: &str) -> Result<(), WriteError> {
    if file_name.trim().is_empty() {
        return Err(WriteError::InvalidRequest("file name is empty".to_string()));
    }

    if file_name.contains('/') || file_name.contains('\\') || file_name.contains('\0') {
        log::warn!("[Storage] Rejected file name with separators: {}", file_name);
        return Err(WriteError::InvalidRequest(
            "file name must not contain path separators".to_string(),
        ));
    }

    check_segment(file_name, "file name")?;
    check_encoded_traversal(file_name, "file name")
}

fn check_segment(segment: &str, what: &str) -> Result<(), WriteError> {
    if segment.trim().is_empty() {
        return Err(WriteError::InvalidRequest(format!(
            "{} contains an empty path segment",
            what
        )));
    }
    if segment == "." || segment == ".." {
        log::warn!("[Storage] Rejected {} with traversal segment", what);
        return Err(WriteError::InvalidRequest(format!(
            "{} contains a traversal segment",
            what
        )));
    }

    // Drive prefixes ("C:") and alternate data streams ("memo.pdf:x")
    if segment.contains(':') {
        log::warn!("[Storage] Rejected {} with drive or stream separator: {}", what, segment);
        return Err(WriteError::InvalidRequest(format!(
            "{} must not contain ':'",
            what
        )));
    }

    let stem = segment.split('.').next().unwrap_or(segment).trim_end();
    if RESERVED_DEVICE_NAMES
        .iter()
        .any(|device| stem.eq_ignore_ascii_case(device))
    {
        log::warn!("[Storage] Rejected {} naming a device: {}", what, segment);
        return Err(WriteError::InvalidRequest(format!(
            "{} is a reserved device name",
            what
        )));
    }

    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(WriteError::InvalidRequest(format!(
            "{} segment '{}' is not a plain name",
            what, segment
        ))),
    }
}

// "%2e%2e" and friends decode to traversal sequences on some brokers
fn check_encoded_traversal(name: &str, what: &str) -> Result<(), WriteError> {
    let decoded = urlencoding::decode(name).unwrap_or_else(|_| name.into());
    if decoded != name
        && decoded
            .split(['/', '\\'])
            .any(|segment| segment == "." || segment == "..")
    {
        log::warn!("[Storage] Rejected {} with encoded traversal sequence", what);
        return Err(WriteError::InvalidRequest(format!(
            "{} contains an encoded traversal sequence",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    fn kind_of(request: &WriteRequest) -> Option<ErrorKind> {
        validate_request(request).err().map(|e| e.kind())
    }

    #[test]
    fn test_well_formed_request() {
        assert!(validate_request(&WriteRequest::new(vec![1], "Invoices", "memo1.pdf")).is_ok());
        assert!(validate_request(&WriteRequest::new(vec![1], "Invoices/2026", "memo1.pdf")).is_ok());
        // Dots inside a name are fine
        assert!(validate_request(&WriteRequest::new(vec![1], "v1..2", "memo..pdf")).is_ok());
    }

    #[test]
    fn test_empty_fields() {
        let invalid = Some(ErrorKind::InvalidRequest);
        assert_eq!(kind_of(&WriteRequest::new(vec![], "Invoices", "memo.pdf")), invalid);
        assert_eq!(kind_of(&WriteRequest::new(vec![1], "", "memo.pdf")), invalid);
        assert_eq!(kind_of(&WriteRequest::new(vec![1], "Invoices", "")), invalid);
        assert_eq!(kind_of(&WriteRequest::new(vec![1], "   ", "memo.pdf")), invalid);
    }

    #[test]
    fn test_folder_traversal() {
        assert!(validate_folder_name("../etc").is_err());
        assert!(validate_folder_name("Invoices/../../etc").is_err());
        assert!(validate_folder_name("/sdcard/Invoices").is_err());
        assert!(validate_folder_name("~/Invoices").is_err());
        assert!(validate_folder_name("Invoices//2026").is_err());
        assert!(validate_folder_name("Invoices\\2026").is_err());
        assert!(validate_folder_name("Invoices/%2e%2e/secret").is_err());
        assert!(validate_folder_name("Invoices/%2E%2E").is_err());
    }

    #[test]
    fn test_file_separators() {
        assert!(validate_file_name("a/memo.pdf").is_err());
        assert!(validate_file_name("a\\memo.pdf").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name("%2e%2e").is_err());
        assert!(validate_file_name("memo%201.pdf").is_ok());
    }

    #[test]
    fn test_drive_and_stream_names() {
        assert!(validate_folder_name("C:").is_err());
        assert!(validate_folder_name("Invoices/C:").is_err());
        assert!(validate_folder_name("D:Invoices").is_err());
        assert!(validate_file_name("C:evil.pdf").is_err());
        assert!(validate_file_name("memo.pdf:stream").is_err());
        assert!(validate_file_name("memo.pdf::$DATA").is_err());
    }

    #[test]
    fn test_device_names() {
        assert!(validate_file_name("NUL.pdf").is_err());
        assert!(validate_file_name("con").is_err());
        assert!(validate_file_name("Com1.pdf").is_err());
        assert!(validate_file_name("lpt9.tar.pdf").is_err());
        assert!(validate_folder_name("Invoices/aux").is_err());
        assert!(validate_folder_name("PRN/2026").is_err());
        // Only the exact device name is reserved
        assert!(validate_file_name("console.pdf").is_ok());
        assert!(validate_file_name("nullable.pdf").is_ok());
        assert!(validate_folder_name("COM10").is_ok());
    }
}
