//! Native storage bridge for generated cash-memo PDFs.
//!
//! The UI layer hands over rendered bytes plus a folder and file name;
//! [`request_write`] persists them to user-visible storage and answers with a
//! location or a typed failure. Which storage API is used depends on the host:
//!
//! - **Legacy** hosts write straight into the shared documents directory after
//!   the user grants the storage permission
//! - **Mediated** hosts register an entry with the platform storage broker and
//!   stream the bytes through it
//!
//! Everything is wired through a [`WriteCoordinator`], which keeps no state
//! between calls.

pub mod capability;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod permissions;
pub mod sanitize;
pub mod storage;
pub mod types;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

pub use capability::CapabilityProbe;
pub use config::{DuplicatePolicy, StorageConfig};
pub use coordinator::WriteCoordinator;
pub use error::WriteError;
pub use permissions::{AutoGrantHost, CallbackPermissionHost, PermissionGate, PermissionHost, PermissionResponder};
pub use storage::{DirectoryBroker, MemoryBroker, StorageBroker, StorageWriter};
pub use types::{CapabilityTier, ErrorKind, PermissionState, WriteOutcome, WriteRequest, WriteResponse};

/// Bridge entry point: persist `payload` as `<documents>/<folder_name>/<file_name>`
pub async fn request_write(
    coordinator: &WriteCoordinator,
    payload: Vec<u8>,
    folder_name: String,
    file_name: String,
) -> WriteResponse {
    coordinator
        .write(WriteRequest {
            payload,
            folder_name,
            file_name,
        })
        .await
        .into()
}

/// Coordinator for desktop hosts: no permission prompt, and a directory-backed
/// broker rooted at shared storage so both tiers land in the same folder
pub fn desktop_coordinator(
    config: &StorageConfig,
    platform_version: Option<u32>,
) -> Result<WriteCoordinator, String> {
    let probe = match platform_version {
        Some(version) => CapabilityProbe::with_threshold(version, config.mediated_min_version),
        None => CapabilityProbe::detect(config.mediated_min_version),
    };

    let shared_root = config.shared_storage_root()?;

    WriteCoordinator::from_config(
        config,
        probe,
        Arc::new(AutoGrantHost),
        Arc::new(DirectoryBroker::new(shared_root)),
    )
}

const USAGE: &str =
    "usage: cashmemo-storage <pdf-file> <folder> <file-name> [--config <json>] [--platform-version <n>]";

/// Command-line host: write one PDF and return the bridge response
pub fn run() -> Result<WriteResponse, String> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let mut positional = Vec::new();
    let mut config_path: Option<PathBuf> = None;
    let mut platform_version: Option<u32> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or_else(|| USAGE.to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--platform-version" => {
                let value = args.next().ok_or_else(|| USAGE.to_string())?;
                let version = value
                    .parse()
                    .map_err(|e| format!("Invalid platform version '{}': {}", value, e))?;
                platform_version = Some(version);
            }
            _ => positional.push(arg),
        }
    }

    let [pdf_path, folder_name, file_name]: [String; 3] =
        positional.try_into().map_err(|_| USAGE.to_string())?;

    let config = match config_path {
        Some(path) => config::load_config(&path)?,
        None => StorageConfig::default(),
    };
    let coordinator = desktop_coordinator(&config, platform_version)?;
    log::info!("[Storage] Host storage tier: {:?}", coordinator.tier());

    let payload = std::fs::read(&pdf_path)
        .map_err(|e| format!("Failed to read {}: {}", pdf_path, e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    Ok(runtime.block_on(request_write(&coordinator, payload, folder_name, file_name)))
}
