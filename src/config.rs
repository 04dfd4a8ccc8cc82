//! Storage configuration
//!
//! This module holds the constants the writer is parametrized by and the
//! on-disk JSON settings that can override them:
//! - Platform version at which the mediated (broker) tier begins
//! - Name of the shared documents root
//! - MIME type registered for written documents
//! - Permission wait bound and duplicate-entry policy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils;

/// First platform version (Android 10 / API 29) where shared storage is only
/// reachable through the storage broker.
pub const MEDIATED_STORAGE_MIN_VERSION: u32 = 29;

/// Shared folder every document lands under
pub const DOCUMENTS_ROOT: &str = "Documents";

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// How long a legacy write waits for the host's permission callback
pub const DEFAULT_PERMISSION_TIMEOUT_SECS: u64 = 60;

/// What the mediated backend does when an entry with the same
/// folder and display name is already registered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Reuse the existing entry and truncate it
    #[default]
    Overwrite,
    /// Reject the write with `BrokerRejected`
    Fail,
    /// Register `name (n).ext` for the first free n
    Rename,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_mediated_min_version")]
    pub mediated_min_version: u32,
    #[serde(default = "default_documents_root")]
    pub documents_root: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default = "default_permission_timeout_secs")]
    pub permission_timeout_secs: u64,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Root of shared external storage for the legacy tier (None = detect)
    #[serde(default)]
    pub external_storage_root: Option<PathBuf>,
}

fn default_mediated_min_version() -> u32 {
    MEDIATED_STORAGE_MIN_VERSION
}

fn default_documents_root() -> String {
    DOCUMENTS_ROOT.to_string()
}

fn default_mime_type() -> String {
    PDF_MIME_TYPE.to_string()
}

fn default_permission_timeout_secs() -> u64 {
    DEFAULT_PERMISSION_TIMEOUT_SECS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mediated_min_version: MEDIATED_STORAGE_MIN_VERSION,
            documents_root: DOCUMENTS_ROOT.to_string(),
            mime_type: PDF_MIME_TYPE.to_string(),
            permission_timeout_secs: DEFAULT_PERMISSION_TIMEOUT_SECS,
            duplicate_policy: DuplicatePolicy::Overwrite,
            external_storage_root: None,
        }
    }
}

impl StorageConfig {
    pub fn permission_timeout(&self) -> Duration {
        Duration::from_secs(self.permission_timeout_secs)
    }

    /// Root of shared external storage; `documents_root` is resolved under it
    pub fn shared_storage_root(&self) -> Result<PathBuf, String> {
        match &self.external_storage_root {
            Some(root) => Ok(root.clone()),
            None => detect_shared_storage_root(),
        }
    }

    /// Directory the legacy backend writes into (`<external-root>/<documents-root>`)
    pub fn legacy_documents_dir(&self) -> Result<PathBuf, String> {
        let root = self.shared_storage_root()?;
        Ok(utils::join_relative(&root, &self.documents_root))
    }
}

/// Android exposes shared storage through $EXTERNAL_STORAGE
#[cfg(target_os = "android")]
fn detect_shared_storage_root() -> Result<PathBuf, String> {
    Ok(std::env::var_os("EXTERNAL_STORAGE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/storage/emulated/0")))
}

/// The folder holding the user's documents directory, usually their home
#[cfg(not(target_os = "android"))]
fn detect_shared_storage_root() -> Result<PathBuf, String> {
    dirs::document_dir()
        .and_then(|dir| dir.parent().map(PathBuf::from))
        .or_else(dirs::home_dir)
        .ok_or_else(|| "Could not determine shared storage root".to_string())
}

/// Load the storage config from disk, falling back to defaults when absent
pub fn load_config(path: &Path) -> Result<StorageConfig, String> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read storage config: {}", e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse storage config: {}", e))
    } else {
        Ok(StorageConfig::default())
    }
}

/// Save the storage config to disk
pub fn save_config(path: &Path, config: &StorageConfig) -> Result<(), String> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize storage config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write storage config: {}", e))
}
