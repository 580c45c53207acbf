//! Representation of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::common::CpuShare;

/// Status of virtual machine, used by the reporting layer only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum VmStatus {
    Initializing,
    Running,
    Migrating,
    Finished,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Initializing => write!(f, "initializing"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Migrating => write!(f, "migrating"),
            VmStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Represents virtual machine (VM).
///
/// A VM is characterized by its requested CPU share and the share currently
/// granted by the host it resides on. The granted share is mutated only by
/// the host-level schedulers. Migration flags are set by the external engine
/// while the VM is being moved between hosts.
#[derive(Clone, Debug)]
pub struct VirtualMachine {
    pub id: u32,
    requested: CpuShare,
    granted: CpuShare,
    migrating_in: bool,
    migrating_out: bool,
    status: VmStatus,
}

impl VirtualMachine {
    /// Creates virtual machine with the given requested share.
    pub fn new(id: u32, requested: CpuShare) -> Self {
        Self {
            id,
            requested,
            granted: CpuShare::empty(),
            migrating_in: false,
            migrating_out: false,
            status: VmStatus::Initializing,
        }
    }

    /// Number of cores the VM demands.
    pub fn cores(&self) -> u32 {
        self.requested.cores
    }

    pub fn requested_share(&self) -> CpuShare {
        self.requested
    }

    pub fn granted_share(&self) -> CpuShare {
        self.granted
    }

    pub(crate) fn set_granted_share(&mut self, share: CpuShare) {
        self.granted = share;
    }

    pub fn is_migrating_in(&self) -> bool {
        self.migrating_in
    }

    pub fn is_migrating_out(&self) -> bool {
        self.migrating_out
    }

    pub fn set_migrating_in(&mut self, value: bool) {
        self.migrating_in = value;
    }

    pub fn set_migrating_out(&mut self, value: bool) {
        self.migrating_out = value;
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }
}
