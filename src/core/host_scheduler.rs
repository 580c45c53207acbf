//! Machine-level scheduler contract.

use crate::core::common::{AllocationVerdict, CpuShare};
use crate::core::vm::VirtualMachine;

/// Allocates a host's CPU capacity to the virtual machines residing on it.
///
/// Two strategies implement the contract: exclusive core ownership
/// ([`SpaceSharedHostScheduler`](crate::core::host_schedulers::space_shared::SpaceSharedHostScheduler))
/// and fractional sharing
/// ([`TimeSharedHostScheduler`](crate::core::host_schedulers::time_shared::TimeSharedHostScheduler)).
/// The strategy is selected at host construction and injected as a trait
/// object.
///
/// The scheduler exclusively owns the host's core list; a VM's granted
/// share is mutated only through these methods.
pub trait HostScheduler {
    /// Grants capacity for the VM according to the given requested share.
    /// The request is scaled by the migration overhead policy before
    /// matching. On any verdict that is not granted neither the scheduler
    /// state nor the VM is modified. Allocating for a VM that already
    /// holds a grant atomically replaces the old grant.
    fn allocate(&mut self, vm: &mut VirtualMachine, requested: &CpuShare) -> AllocationVerdict;

    /// Grants capacity for the VM's own requested share.
    fn allocate_for_vm(&mut self, vm: &mut VirtualMachine) -> AllocationVerdict {
        let requested = vm.requested_share();
        self.allocate(vm, &requested)
    }

    /// Releases everything the VM holds and clears its granted share.
    /// Unknown VMs are ignored.
    fn deallocate(&mut self, vm: &mut VirtualMachine);

    /// Releases the given number of the VM's cores. Zero cores or an
    /// unknown VM is a contract violation; releasing at least as many
    /// cores as held behaves as a full deallocation.
    fn deallocate_cores(&mut self, vm: &mut VirtualMachine, cores: u32) -> AllocationVerdict;

    /// Non-mutating feasibility check for the VM's current request.
    fn is_suitable(&self, vm: &VirtualMachine) -> bool {
        self.is_suitable_for(vm, &vm.requested_share())
    }

    /// Non-mutating feasibility check for an arbitrary share.
    fn is_suitable_for(&self, vm: &VirtualMachine, requested: &CpuShare) -> bool;

    /// Share currently granted to the VM, empty if none or the host is
    /// failed.
    fn granted_share(&self, vm_id: u32) -> CpuShare;

    /// Capacity in MIPS still available for allocation.
    fn available_mips(&self) -> f64;

    /// Total capacity of the working cores in MIPS.
    fn total_mips(&self) -> f64;

    /// Marks the host as failed or repaired. A failed host reports zero
    /// availability, every held share reads as revoked and every mutation
    /// is rejected.
    fn set_failed(&mut self, failed: bool);

    fn is_failed(&self) -> bool;
}
