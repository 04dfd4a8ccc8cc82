//! Storage broker backed by a directory tree.
//!
//! Entries are plain files under `root/<relative_path>/<display_name>`, handed
//! out as `content://<authority>/<percent-encoded path>` URIs so callers see
//! the same opaque locator shape as with a platform broker.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::storage::mediated::{BrokerEntry, BrokerHandle, StorageBroker};
use crate::utils;

pub const DEFAULT_AUTHORITY: &str = "cashmemo.documents";

#[derive(Clone, Debug)]
pub struct DirectoryBroker {
    root: PathBuf,
    authority: String,
}

impl DirectoryBroker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_authority(root, DEFAULT_AUTHORITY)
    }

    pub fn with_authority(root: impl Into<PathBuf>, authority: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            authority: authority.into(),
        }
    }

    fn uri_for(&self, relative_path: &str, display_name: &str) -> String {
        let encoded: Vec<String> = relative_path
            .split('/')
            .filter(|s| !s.is_empty())
            .chain(std::iter::once(display_name))
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("content://{}/{}", self.authority, encoded.join("/"))
    }

    /// Map a handle back onto the file it names, refusing anything that
    /// would leave the broker root
    fn path_for(&self, handle: &BrokerHandle) -> Option<PathBuf> {
        let prefix = format!("content://{}/", self.authority);
        let rest = handle.uri.strip_prefix(&prefix)?;

        let mut path = self.root.clone();
        for segment in rest.split('/') {
            let decoded = urlencoding::decode(segment).ok()?;
            if decoded.is_empty()
                || decoded == "."
                || decoded == ".."
                || decoded.contains(['/', '\\'])
            {
                log::warn!("[Broker] Rejected malformed handle: {}", handle.uri);
                return None;
            }
            path.push(&*decoded);
        }
        Some(path)
    }
}

impl StorageBroker for DirectoryBroker {
    fn find(&self, relative_path: &str, display_name: &str) -> Option<BrokerHandle> {
        let path = utils::join_relative(&self.root, relative_path).join(display_name);
        path.is_file().then(|| BrokerHandle {
            uri: self.uri_for(relative_path, display_name),
        })
    }

    fn insert(&self, entry: &BrokerEntry) -> Option<BrokerHandle> {
        let dir = utils::join_relative(&self.root, &entry.relative_path);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            log::error!("[Broker] Failed to create {}: {}", dir.display(), e);
            return None;
        }

        let path = dir.join(&entry.display_name);
        match File::options().write(true).create_new(true).open(&path) {
            Ok(_) => Some(BrokerHandle {
                uri: self.uri_for(&entry.relative_path, &entry.display_name),
            }),
            Err(e) => {
                log::error!("[Broker] Failed to register {}: {}", path.display(), e);
                None
            }
        }
    }

    fn open_write(&self, handle: &BrokerHandle) -> Option<Box<dyn Write + Send>> {
        let path = self.path_for(handle)?;
        if !path.is_file() {
            return None;
        }
        File::create(&path)
            .map(|file| Box::new(file) as Box<dyn Write + Send>)
            .map_err(|e| log::error!("[Broker] Failed to open {}: {}", path.display(), e))
            .ok()
    }

    fn open_read(&self, handle: &BrokerHandle) -> Option<Box<dyn Read + Send>> {
        let path = self.path_for(handle)?;
        File::open(&path)
            .map(|file| Box::new(file) as Box<dyn Read + Send>)
            .ok()
    }
}
