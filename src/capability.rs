//! Storage capability detection.
//!
//! The tier is a pure function of the host platform version: hosts older than
//! the threshold write straight to shared storage, newer ones must go through
//! the storage broker.

use crate::config::MEDIATED_STORAGE_MIN_VERSION;
use crate::types::CapabilityTier;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapabilityProbe {
    platform_version: u32,
    mediated_min_version: u32,
}

impl CapabilityProbe {
    /// Capability of a host reporting `platform_version`, using the default threshold
    pub fn new(platform_version: u32) -> Self {
        Self::with_threshold(platform_version, MEDIATED_STORAGE_MIN_VERSION)
    }

    pub fn with_threshold(platform_version: u32, mediated_min_version: u32) -> Self {
        Self {
            platform_version,
            mediated_min_version,
        }
    }

    /// Capability of the running host. Hosts that report no platform version
    /// have no legacy storage permission model and use the mediated tier.
    pub fn detect(mediated_min_version: u32) -> Self {
        let platform_version = host_platform_version().unwrap_or(u32::MAX);
        log::debug!(
            "[Storage] Host platform version {} (mediated from {})",
            platform_version,
            mediated_min_version
        );
        Self::with_threshold(platform_version, mediated_min_version)
    }

    pub fn platform_version(&self) -> u32 {
        self.platform_version
    }

    pub fn tier(&self) -> CapabilityTier {
        if self.platform_version >= self.mediated_min_version {
            CapabilityTier::Mediated
        } else {
            CapabilityTier::Legacy
        }
    }
}

/// Read the SDK level from the system properties
#[cfg(target_os = "android")]
pub fn host_platform_version() -> Option<u32> {
    let output = std::process::Command::new("getprop")
        .arg("ro.build.version.sdk")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

#[cfg(not(target_os = "android"))]
pub fn host_platform_version() -> Option<u32> {
    None
}
