//! Typed write failures.
//!
//! Every failure carries a human-readable detail and maps onto exactly one
//! caller-visible [`ErrorKind`].

use crate::types::{ErrorKind, WriteOutcome};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("write permission denied: {0}")]
    PermissionDenied(String),

    #[error("no permission decision: {0}")]
    PermissionTimeout(String),

    #[error("failed to create directory: {0}")]
    DirectoryCreate(String),

    #[error("storage broker rejected entry: {0}")]
    BrokerRejected(String),

    #[error("no write channel: {0}")]
    ChannelUnavailable(String),

    #[error("write failed: {0}")]
    WriteIo(String),
}

impl WriteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WriteError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            WriteError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            WriteError::PermissionTimeout(_) => ErrorKind::PermissionTimeout,
            WriteError::DirectoryCreate(_) => ErrorKind::DirectoryCreateError,
            WriteError::BrokerRejected(_) => ErrorKind::BrokerRejected,
            WriteError::ChannelUnavailable(_) => ErrorKind::ChannelUnavailable,
            WriteError::WriteIo(_) => ErrorKind::WriteIoError,
        }
    }
}

impl From<WriteError> for WriteOutcome {
    fn from(err: WriteError) -> Self {
        WriteOutcome::Failure {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}
