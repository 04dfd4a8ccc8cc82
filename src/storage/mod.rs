//! Document storage backends.
//!
//! Both backends share one contract: `(payload, folder, file) -> location`.
//! [`StorageWriter`] holds one of each and picks by [`CapabilityTier`]:
//!
//! - **Legacy**: direct filesystem writes under the shared documents directory
//! - **Mediated**: entries registered with a [`StorageBroker`]
//!
//! Writes are synchronous and make a single attempt; nothing is retried or
//! rolled back here.

pub mod directory_broker;
pub mod legacy;
pub mod mediated;
pub mod memory_broker;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::WriteError;
use crate::types::CapabilityTier;

pub use directory_broker::DirectoryBroker;
pub use legacy::LegacyBackend;
pub use mediated::{BrokerEntry, BrokerHandle, MediatedBackend, StorageBroker};
pub use memory_broker::{BrokerFaults, MemoryBroker};

pub trait DocumentBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write `payload` to `<documents-root>/<folder_name>/<file_name>` and
    /// return where it landed
    fn write(&self, payload: &[u8], folder_name: &str, file_name: &str) -> Result<String, WriteError>;
}

#[derive(Clone)]
pub struct StorageWriter {
    legacy: LegacyBackend,
    mediated: MediatedBackend,
}

impl StorageWriter {
    pub fn new(legacy: LegacyBackend, mediated: MediatedBackend) -> Self {
        Self { legacy, mediated }
    }

    /// Build both backends from config, with `broker` serving the mediated tier
    pub fn from_config(config: &StorageConfig, broker: Arc<dyn StorageBroker>) -> Result<Self, String> {
        let legacy = LegacyBackend::new(config.legacy_documents_dir()?);
        let mediated = MediatedBackend::new(
            broker,
            config.documents_root.clone(),
            config.mime_type.clone(),
            config.duplicate_policy,
        );
        Ok(Self::new(legacy, mediated))
    }

    pub fn backend(&self, tier: CapabilityTier) -> &dyn DocumentBackend {
        match tier {
            CapabilityTier::Legacy => &self.legacy,
            CapabilityTier::Mediated => &self.mediated,
        }
    }

    pub fn write(
        &self,
        tier: CapabilityTier,
        payload: &[u8],
        folder_name: &str,
        file_name: &str,
    ) -> Result<String, WriteError> {
        let backend = self.backend(tier);
        log::debug!(
            "[Storage] Writing {} bytes to {}/{} via {} backend",
            payload.len(),
            folder_name,
            file_name,
            backend.name()
        );
        backend.write(payload, folder_name, file_name)
    }
}
