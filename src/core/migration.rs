//! Migration overhead policy consulted by both scheduling levels.

use crate::core::config::SimulationConfig;
use crate::core::vm::VirtualMachine;

/// Returns the fraction of the requested rate that is actually requested
/// from the host for a VM in the given migration state.
///
/// A VM migrating in consumes only the migration overhead on the target
/// host; a VM migrating out keeps serving at a degraded rate on the source
/// host.
pub fn capacity_factor(migrating_in: bool, migrating_out: bool, overhead_fraction: f64) -> f64 {
    if migrating_in {
        overhead_fraction
    } else if migrating_out {
        1. - overhead_fraction
    } else {
        1.
    }
}

/// Fraction of the granted rate a VM can actually deliver to its tasks.
/// Only outbound migration degrades the service: a migrating-in VM's grant
/// was already throttled by the target host.
pub fn service_factor(migrating_out: bool, overhead_fraction: f64) -> f64 {
    if migrating_out {
        1. - overhead_fraction
    } else {
        1.
    }
}

pub(crate) fn vm_capacity_factor(vm: &VirtualMachine, config: &SimulationConfig) -> f64 {
    capacity_factor(
        vm.is_migrating_in(),
        vm.is_migrating_out(),
        config.migration_overhead_fraction,
    )
}

pub(crate) fn vm_service_factor(vm: &VirtualMachine, config: &SimulationConfig) -> f64 {
    service_factor(vm.is_migrating_out(), config.migration_overhead_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_factor() {
        assert_eq!(capacity_factor(true, false, 0.1), 0.1);
        assert_eq!(capacity_factor(false, true, 0.1), 0.9);
        assert_eq!(capacity_factor(false, false, 0.1), 1.);
    }

    #[test]
    fn test_service_factor() {
        assert_eq!(service_factor(true, 0.25), 0.75);
        assert_eq!(service_factor(false, 0.25), 1.);
    }
}
