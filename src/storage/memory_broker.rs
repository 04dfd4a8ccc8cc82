//! In-process storage broker.
//!
//! Hands out `content://` URIs for entries kept in memory. Used by hosts that
//! have no platform broker and by tests, which can inject broker faults.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::storage::mediated::{BrokerEntry, BrokerHandle, StorageBroker};

const URI_PREFIX: &str = "content://media/external/file/";

/// Failures the broker simulates
#[derive(Clone, Copy, Debug, Default)]
pub struct BrokerFaults {
    /// `insert` returns no handle
    pub reject_inserts: bool,
    /// `open_write` returns no channel
    pub refuse_channels: bool,
    /// Every write on an opened channel fails
    pub fail_transfers: bool,
}

struct MemoryEntry {
    entry: BrokerEntry,
    data: Arc<Mutex<Vec<u8>>>,
}

#[derive(Default)]
pub struct MemoryBroker {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    next_id: AtomicU64,
    calls: AtomicUsize,
    faults: BrokerFaults,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: BrokerFaults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Number of broker calls made so far, of any kind
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }

    pub fn entry(&self, handle: &BrokerHandle) -> Option<BrokerEntry> {
        self.lock().get(&handle.uri).map(|e| e.entry.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn data(&self, handle: &BrokerHandle) -> Option<Arc<Mutex<Vec<u8>>>> {
        self.lock().get(&handle.uri).map(|e| e.data.clone())
    }
}

impl StorageBroker for MemoryBroker {
    fn find(&self, relative_path: &str, display_name: &str) -> Option<BrokerHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .iter()
            .find(|(_, e)| {
                e.entry.relative_path == relative_path && e.entry.display_name == display_name
            })
            .map(|(uri, _)| BrokerHandle { uri: uri.clone() })
    }

    fn insert(&self, entry: &BrokerEntry) -> Option<BrokerHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.reject_inserts {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let uri = format!("{}{}", URI_PREFIX, id);
        self.lock().insert(
            uri.clone(),
            MemoryEntry {
                entry: entry.clone(),
                data: Arc::new(Mutex::new(Vec::new())),
            },
        );
        Some(BrokerHandle { uri })
    }

    fn open_write(&self, handle: &BrokerHandle) -> Option<Box<dyn Write + Send>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.refuse_channels {
            return None;
        }

        let data = self.data(handle)?;
        data.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Some(Box::new(MemoryChannel {
            data,
            fail: self.faults.fail_transfers,
        }))
    }

    fn open_read(&self, handle: &BrokerHandle) -> Option<Box<dyn Read + Send>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = self.data(handle)?;
        let snapshot = data.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Some(Box::new(Cursor::new(snapshot)))
    }
}

struct MemoryChannel {
    data: Arc<Mutex<Vec<u8>>>,
    fail: bool,
}

impl Write for MemoryChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::other("simulated broker transfer fault"));
        }
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
