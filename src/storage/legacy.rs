//! Direct filesystem backend for hosts that predate the storage broker.
//!
//! Documents land at `<documents-dir>/<folder>/<file>`. The file is created or
//! truncated, written in full and flushed; it is not fsynced.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use crate::error::WriteError;
use crate::storage::DocumentBackend;
use crate::utils;

#[derive(Clone, Debug)]
pub struct LegacyBackend {
    documents_dir: PathBuf,
}

impl LegacyBackend {
    pub fn new(documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
        }
    }
}

impl DocumentBackend for LegacyBackend {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn write(&self, payload: &[u8], folder_name: &str, file_name: &str) -> Result<String, WriteError> {
        let dir = utils::join_relative(&self.documents_dir, folder_name);

        // Directories created here stay behind if the write below fails
        std::fs::create_dir_all(&dir).map_err(|e| {
            log::error!("[Storage] Failed to create {}: {}", dir.display(), e);
            WriteError::DirectoryCreate(format!("{}: {}", dir.display(), e))
        })?;

        let path = dir.join(file_name);
        let io_err = |e: std::io::Error| {
            log::error!("[Storage] Failed to write {}: {}", path.display(), e);
            WriteError::WriteIo(format!("{}: {}", path.display(), e))
        };

        let mut file = File::create(&path).map_err(io_err)?;
        file.write_all(payload).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        drop(file);

        let location = utils::normalize_path(path.clone());
        log::info!(
            "[Storage] Saved {} bytes to {}",
            payload.len(),
            location.display()
        );
        Ok(location.to_string_lossy().to_string())
    }
}
