//! Storage-broker backend for hosts with mediated (scoped) storage.
//!
//! A write registers a logical entry with the broker (display name, MIME type,
//! relative path under the documents root), opens a write channel for the
//! returned handle, writes every byte and flushes before closing.
//!
//! A failed transfer is not rolled back: the entry stays registered with
//! whatever bytes reached the broker.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::config::DuplicatePolicy;
use crate::error::WriteError;
use crate::storage::DocumentBackend;
use crate::utils;

/// Highest `(n)` suffix tried when renaming around an existing entry
const MAX_RENAME_ATTEMPTS: u32 = 32;

/// Entry registered with the broker before any bytes are written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerEntry {
    pub display_name: String,
    pub mime_type: String,
    /// `/`-separated path under the broker's shared volume, e.g. "Documents/Invoices"
    pub relative_path: String,
}

/// Handle to a registered entry; `uri` is what callers get back
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BrokerHandle {
    pub uri: String,
}

/// The platform storage broker (a content provider on Android).
///
/// "No handle" and "no channel" are `None`; faults during the byte transfer
/// surface through the returned writer.
pub trait StorageBroker: Send + Sync {
    /// Look up an entry already registered under `relative_path` with `display_name`
    fn find(&self, relative_path: &str, display_name: &str) -> Option<BrokerHandle>;

    fn insert(&self, entry: &BrokerEntry) -> Option<BrokerHandle>;

    /// Open a truncating write channel for a registered entry
    fn open_write(&self, handle: &BrokerHandle) -> Option<Box<dyn Write + Send>>;

    fn open_read(&self, handle: &BrokerHandle) -> Option<Box<dyn Read + Send>>;
}

#[derive(Clone)]
pub struct MediatedBackend {
    broker: Arc<dyn StorageBroker>,
    documents_root: String,
    mime_type: String,
    duplicate_policy: DuplicatePolicy,
}

impl MediatedBackend {
    pub fn new(
        broker: Arc<dyn StorageBroker>,
        documents_root: impl Into<String>,
        mime_type: impl Into<String>,
        duplicate_policy: DuplicatePolicy,
    ) -> Self {
        Self {
            broker,
            documents_root: documents_root.into(),
            mime_type: mime_type.into(),
            duplicate_policy,
        }
    }

    /// Resolve the handle to write through, applying the duplicate policy
    fn register(&self, relative_path: &str, file_name: &str) -> Result<BrokerHandle, WriteError> {
        let existing = self.broker.find(relative_path, file_name);

        let display_name = match (existing, self.duplicate_policy) {
            (None, _) => file_name.to_string(),
            (Some(handle), DuplicatePolicy::Overwrite) => {
                log::info!("[Broker] Overwriting existing entry {}", handle.uri);
                return Ok(handle);
            }
            (Some(handle), DuplicatePolicy::Fail) => {
                log::warn!("[Broker] Entry already exists: {}", handle.uri);
                return Err(WriteError::BrokerRejected(format!(
                    "{}/{} already exists",
                    relative_path, file_name
                )));
            }
            (Some(_), DuplicatePolicy::Rename) => (1..=MAX_RENAME_ATTEMPTS)
                .map(|n| numbered_name(file_name, n))
                .find(|candidate| self.broker.find(relative_path, candidate).is_none())
                .ok_or_else(|| {
                    WriteError::BrokerRejected(format!(
                        "no free name for {}/{}",
                        relative_path, file_name
                    ))
                })?,
        };

        let entry = BrokerEntry {
            display_name,
            mime_type: self.mime_type.clone(),
            relative_path: relative_path.to_string(),
        };
        self.broker.insert(&entry).ok_or_else(|| {
            log::error!(
                "[Broker] Broker returned no handle for {}/{}",
                entry.relative_path,
                entry.display_name
            );
            WriteError::BrokerRejected(format!(
                "broker returned no handle for {}/{}",
                entry.relative_path, entry.display_name
            ))
        })
    }
}

impl DocumentBackend for MediatedBackend {
    fn name(&self) -> &'static str {
        "mediated"
    }

    fn write(&self, payload: &[u8], folder_name: &str, file_name: &str) -> Result<String, WriteError> {
        let relative_path = utils::logical_path(&self.documents_root, folder_name);
        let handle = self.register(&relative_path, file_name)?;

        let mut channel = self.broker.open_write(&handle).ok_or_else(|| {
            log::error!("[Broker] No write channel for {}", handle.uri);
            WriteError::ChannelUnavailable(format!("no write channel for {}", handle.uri))
        })?;

        let io_err = |e: std::io::Error| {
            log::error!("[Broker] Transfer to {} failed: {}", handle.uri, e);
            WriteError::WriteIo(format!("{}: {}", handle.uri, e))
        };
        channel.write_all(payload).map_err(io_err)?;
        channel.flush().map_err(io_err)?;
        drop(channel);

        log::info!("[Broker] Saved {} bytes to {}", payload.len(), handle.uri);
        Ok(handle.uri)
    }
}

/// "memo.pdf" -> "memo (2).pdf"
fn numbered_name(file_name: &str, n: u32) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", file_name, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_broker::{BrokerFaults, MemoryBroker};
    use crate::types::ErrorKind;

    fn backend(broker: Arc<MemoryBroker>, policy: DuplicatePolicy) -> MediatedBackend {
        MediatedBackend::new(broker, "Documents", "application/pdf", policy)
    }

    fn read_back(broker: &MemoryBroker, uri: &str) -> Vec<u8> {
        let mut reader = broker
            .open_read(&BrokerHandle { uri: uri.to_string() })
            .unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("memo.pdf", 1), "memo (1).pdf");
        assert_eq!(numbered_name("memo.v2.pdf", 3), "memo.v2 (3).pdf");
        assert_eq!(numbered_name("memo", 2), "memo (2)");
        assert_eq!(numbered_name(".pdf", 1), ".pdf (1)");
    }

    #[test]
    fn test_registers_entry_under_documents_root() {
        let broker = Arc::new(MemoryBroker::new());
        let uri = backend(broker.clone(), DuplicatePolicy::Overwrite)
            .write(b"%PDF", "Invoices", "memo.pdf")
            .unwrap();

        let entry = broker.entry(&BrokerHandle { uri: uri.clone() }).unwrap();
        assert_eq!(entry.display_name, "memo.pdf");
        assert_eq!(entry.mime_type, "application/pdf");
        assert_eq!(entry.relative_path, "Documents/Invoices");
        assert_eq!(read_back(&broker, &uri), b"%PDF");
    }

    #[test]
    fn test_overwrite_policy_reuses_entry() {
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(broker.clone(), DuplicatePolicy::Overwrite);

        let first = backend.write(&[9u8; 32], "Invoices", "memo.pdf").unwrap();
        let second = backend.write(b"short", "Invoices", "memo.pdf").unwrap();

        assert_eq!(first, second);
        assert_eq!(broker.entry_count(), 1);
        assert_eq!(read_back(&broker, &second), b"short");
    }

    #[test]
    fn test_fail_policy_rejects_duplicate() {
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(broker.clone(), DuplicatePolicy::Fail);

        let first = backend.write(b"one", "Invoices", "memo.pdf").unwrap();
        let err = backend.write(b"two", "Invoices", "memo.pdf").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BrokerRejected);
        assert_eq!(read_back(&broker, &first), b"one");
    }

    #[test]
    fn test_rename_policy_picks_free_name() {
        let broker = Arc::new(MemoryBroker::new());
        let backend = backend(broker.clone(), DuplicatePolicy::Rename);

        backend.write(b"one", "Invoices", "memo.pdf").unwrap();
        backend.write(b"two", "Invoices", "memo.pdf").unwrap();
        let third = backend.write(b"three", "Invoices", "memo.pdf").unwrap();

        let entry = broker.entry(&BrokerHandle { uri: third }).unwrap();
        assert_eq!(entry.display_name, "memo (2).pdf");
        assert_eq!(broker.entry_count(), 3);
    }

    #[test]
    fn test_broker_faults_map_to_error_kinds() {
        let cases = [
            (
                BrokerFaults { reject_inserts: true, ..Default::default() },
                ErrorKind::BrokerRejected,
            ),
            (
                BrokerFaults { refuse_channels: true, ..Default::default() },
                ErrorKind::ChannelUnavailable,
            ),
            (
                BrokerFaults { fail_transfers: true, ..Default::default() },
                ErrorKind::WriteIoError,
            ),
        ];

        for (faults, expected) in cases {
            let broker = Arc::new(MemoryBroker::with_faults(faults));
            let err = backend(broker, DuplicatePolicy::Overwrite)
                .write(b"%PDF", "Invoices", "memo.pdf")
                .unwrap_err();
            assert_eq!(err.kind(), expected);
        }
    }

    #[test]
    fn test_failed_transfer_leaves_entry_registered() {
        let broker = Arc::new(MemoryBroker::with_faults(BrokerFaults {
            fail_transfers: true,
            ..Default::default()
        }));
        let result = backend(broker.clone(), DuplicatePolicy::Overwrite).write(b"%PDF", "Invoices", "memo.pdf");

        assert!(result.is_err());
        let handle = broker.find("Documents/Invoices", "memo.pdf").unwrap();
        assert!(read_back(&broker, &handle.uri).is_empty());
    }
}
