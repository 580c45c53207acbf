//! Common types shared by both scheduling levels.

use serde::Serialize;

/// CPU capacity expressed as a number of cores and a per-core rate in MIPS.
///
/// This is the negotiation currency between scheduling levels: requested,
/// granted and available capacity are all expressed this way.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CpuShare {
    /// Number of cores.
    pub cores: u32,
    /// Rate of a single core in MIPS.
    pub mips_per_core: f64,
}

impl CpuShare {
    /// Creates a new share.
    pub fn new(cores: u32, mips_per_core: f64) -> Self {
        Self { cores, mips_per_core }
    }

    /// Creates a share holding no capacity.
    pub fn empty() -> Self {
        Self {
            cores: 0,
            mips_per_core: 0.,
        }
    }

    /// Total rate of the share in MIPS.
    pub fn total_mips(&self) -> f64 {
        self.cores as f64 * self.mips_per_core
    }

    /// Returns whether the share holds no usable capacity.
    pub fn is_empty(&self) -> bool {
        self.cores == 0 || self.mips_per_core <= 0.
    }
}

/// Outcome of a capacity allocation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum AllocationVerdict {
    /// The full requested share is granted.
    Success,
    /// Only part of the requested rate could be assembled (time-shared
    /// policy); the simulation proceeds with reduced throughput.
    PartialSuccess,
    /// Not enough free working cores for the requested core count.
    NotEnoughCores,
    /// Cores are present but their rates cannot satisfy the request.
    NotEnoughMips,
    /// The host is failed, all requests are rejected.
    HostFailed,
    /// Contract violation: empty share, zero cores to remove etc.
    InvalidRequest,
}

impl AllocationVerdict {
    /// Returns whether any capacity was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, AllocationVerdict::Success | AllocationVerdict::PartialSuccess)
    }
}
