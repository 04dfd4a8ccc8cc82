//! Write coordination
//!
//! One write walks a fixed path and never revisits a state:
//!
//! ```text
//! Validating -> Rejected
//!            -> TierSelected -> PermissionPending (legacy only) -> Writing -> Succeeded | Failed
//! ```
//!
//! The coordinator holds no mutable state, so a single instance can serve
//! overlapping requests. Overlapping writes to the same file are not
//! serialized here.

use std::future::Future;
use std::sync::Arc;

use crate::capability::CapabilityProbe;
use crate::config::StorageConfig;
use crate::error::WriteError;
use crate::permissions::{PermissionGate, PermissionHost};
use crate::sanitize;
use crate::storage::{StorageBroker, StorageWriter};
use crate::types::{CapabilityTier, ErrorKind, PermissionState, WriteOutcome, WriteRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WritePhase {
    Validating,
    Rejected,
    TierSelected(CapabilityTier),
    PermissionPending,
    Writing,
    Succeeded,
    Failed(ErrorKind),
}

fn enter(phase: WritePhase) {
    log::debug!("[Storage] -> {:?}", phase);
}

pub struct WriteCoordinator {
    probe: CapabilityProbe,
    gate: PermissionGate,
    writer: StorageWriter,
}

impl WriteCoordinator {
    pub fn new(probe: CapabilityProbe, gate: PermissionGate, writer: StorageWriter) -> Self {
        Self {
            probe,
            gate,
            writer,
        }
    }

    /// Assemble a coordinator from config for a host with the given capability
    pub fn from_config(
        config: &StorageConfig,
        probe: CapabilityProbe,
        host: Arc<dyn PermissionHost>,
        broker: Arc<dyn StorageBroker>,
    ) -> Result<Self, String> {
        let gate = PermissionGate::new(host, config.permission_timeout());
        let writer = StorageWriter::from_config(config, broker)?;
        Ok(Self::new(probe, gate, writer))
    }

    pub fn tier(&self) -> CapabilityTier {
        self.probe.tier()
    }

    /// Persist one document, returning exactly one outcome
    pub async fn write(&self, request: WriteRequest) -> WriteOutcome {
        self.write_until(request, std::future::pending::<()>()).await
    }

    /// Like [`write`](Self::write); completing `cancel` while the permission
    /// prompt is open ends the write with `PermissionTimeout`
    pub async fn write_until<F>(&self, request: WriteRequest, cancel: F) -> WriteOutcome
    where
        F: Future<Output = ()>,
    {
        match self.run(&request, cancel).await {
            Ok(location) => {
                enter(WritePhase::Succeeded);
                WriteOutcome::Success { location }
            }
            Err(e) => {
                if e.kind() != ErrorKind::InvalidRequest {
                    enter(WritePhase::Failed(e.kind()));
                }
                log::warn!(
                    "[Storage] Write of {}/{} failed: {}",
                    request.folder_name,
                    request.file_name,
                    e
                );
                e.into()
            }
        }
    }

    async fn run<F>(&self, request: &WriteRequest, cancel: F) -> Result<String, WriteError>
    where
        F: Future<Output = ()>,
    {
        enter(WritePhase::Validating);
        if let Err(e) = sanitize::validate_request(request) {
            enter(WritePhase::Rejected);
            return Err(e);
        }

        let tier = self.probe.tier();
        enter(WritePhase::TierSelected(tier));

        if tier == CapabilityTier::Legacy {
            enter(WritePhase::PermissionPending);
            let state = self.gate.ensure_write_permission_until(cancel).await?;
            require_grant(state)?;
        }

        enter(WritePhase::Writing);
        self.writer.write(
            tier,
            &request.payload,
            &request.folder_name,
            &request.file_name,
        )
    }
}

/// Only an explicit grant lets a legacy write proceed
fn require_grant(state: PermissionState) -> Result<(), WriteError> {
    match state {
        PermissionState::Granted => Ok(()),
        PermissionState::Denied => Err(WriteError::PermissionDenied(
            "shared storage write permission was denied".to_string(),
        )),
        PermissionState::Unknown => Err(WriteError::PermissionTimeout(
            "no permission decision was observed".to_string(),
        )),
    }
}
