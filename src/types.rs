//! Core data types for the storage bridge
//!
//! This module contains the values that flow through a single write:
//! - The incoming write request
//! - Capability tier and permission state
//! - The outcome handed back to the UI layer, and its serialized response shape

use serde::{Deserialize, Serialize};
use std::fmt;

/// A rendered document and where the user wants it to land
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub folder_name: String, // e.g. "Invoices" or "Invoices/2026"
    #[serde(default)]
    pub file_name: String, // e.g. "memo1.pdf"
}

impl WriteRequest {
    pub fn new(payload: Vec<u8>, folder_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            payload,
            folder_name: folder_name.into(),
            file_name: file_name.into(),
        }
    }
}

/// Which storage API family the host requires
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityTier {
    /// Direct filesystem paths guarded by a runtime permission
    Legacy,
    /// Writes go through the platform storage broker
    Mediated,
}

/// Write permission as observed during one legacy write attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
}

/// Caller-visible failure classes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidRequest,
    PermissionDenied,
    PermissionTimeout,
    DirectoryCreateError,
    BrokerRejected,
    ChannelUnavailable,
    #[serde(rename = "WriteIOError")]
    WriteIoError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::PermissionTimeout => "PermissionTimeout",
            ErrorKind::DirectoryCreateError => "DirectoryCreateError",
            ErrorKind::BrokerRejected => "BrokerRejected",
            ErrorKind::ChannelUnavailable => "ChannelUnavailable",
            ErrorKind::WriteIoError => "WriteIOError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of exactly one write attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// `location` is a broker URI or an absolute path; treat it as opaque
    Success { location: String },
    Failure { kind: ErrorKind, detail: String },
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Success { .. })
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            WriteOutcome::Success { location } => Some(location),
            WriteOutcome::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            WriteOutcome::Success { .. } => None,
            WriteOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Response shape returned across the bridge:
/// `{"ok":true,"location":..}` or `{"ok":false,"errorKind":..,"detail":..}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<WriteOutcome> for WriteResponse {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Success { location } => Self {
                ok: true,
                location: Some(location),
                error_kind: None,
                detail: None,
            },
            WriteOutcome::Failure { kind, detail } => Self {
                ok: false,
                location: None,
                error_kind: Some(kind),
                detail: Some(detail),
            },
        }
    }
}
