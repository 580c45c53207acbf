//! Space-shared host scheduler with exclusive core ownership.

use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use crate::core::common::{AllocationVerdict, CpuShare};
use crate::core::config::SimulationConfig;
use crate::core::cpu::{CoreStatus, CpuCore};
use crate::core::host_scheduler::HostScheduler;
use crate::core::migration::vm_capacity_factor;
use crate::core::vm::VirtualMachine;

/// Grants each VM exclusive ownership of whole cores.
///
/// A request is feasible only if every requested core can be matched to a
/// free working core with a sufficient rate by a single left-to-right walk
/// of the core list (first-fit, no reordering). Allocation is
/// all-or-nothing; deallocation returns the exact cores previously held.
pub struct SpaceSharedHostScheduler {
    cores: Vec<CpuCore>,
    core_map: IndexMap<u32, Vec<usize>>,
    granted: IndexMap<u32, CpuShare>,
    failed: bool,
    config: Rc<SimulationConfig>,
}

impl SpaceSharedHostScheduler {
    pub fn new(cores: Vec<CpuCore>, config: Rc<SimulationConfig>) -> Self {
        Self {
            cores,
            core_map: IndexMap::new(),
            granted: IndexMap::new(),
            failed: false,
            config,
        }
    }

    /// Creates a scheduler over `count` identical cores.
    pub fn with_uniform_cores(count: u32, rating: f64, config: Rc<SimulationConfig>) -> Self {
        Self::new((0..count).map(|_| CpuCore::new(rating)).collect(), config)
    }

    pub fn cores(&self) -> &[CpuCore] {
        &self.cores
    }

    /// Single left-to-right first-fit walk. Cores already held by the VM
    /// count as free so that re-allocation can be checked without touching
    /// the current grant.
    fn match_cores(&self, own: &[usize], share: &CpuShare) -> Option<Vec<usize>> {
        let needed = share.cores as usize;
        let mut matched = Vec::with_capacity(needed);
        for (idx, core) in self.cores.iter().enumerate() {
            if matched.len() == needed {
                break;
            }
            if core.is_working()
                && (core.is_free() || own.contains(&idx))
                && core.rating() >= share.mips_per_core
            {
                matched.push(idx);
            }
        }
        if matched.len() == needed {
            Some(matched)
        } else {
            None
        }
    }

    fn free_working_count(&self, own: &[usize]) -> usize {
        self.cores
            .iter()
            .enumerate()
            .filter(|(idx, core)| core.is_working() && (core.is_free() || own.contains(idx)))
            .count()
    }

    fn release_vm(&mut self, vm_id: u32) {
        if let Some(held) = self.core_map.shift_remove(&vm_id) {
            for idx in held {
                self.cores[idx].set_status(CoreStatus::Free);
            }
        }
        self.granted.shift_remove(&vm_id);
    }
}

impl HostScheduler for SpaceSharedHostScheduler {
    fn allocate(&mut self, vm: &mut VirtualMachine, requested: &CpuShare) -> AllocationVerdict {
        if self.failed {
            return AllocationVerdict::HostFailed;
        }
        if requested.is_empty() {
            return AllocationVerdict::InvalidRequest;
        }
        let factor = vm_capacity_factor(vm, &self.config);
        let scaled = CpuShare::new(requested.cores, requested.mips_per_core * factor);
        let own = self.core_map.get(&vm.id).cloned().unwrap_or_default();
        if self.free_working_count(&own) < scaled.cores as usize {
            debug!("not enough free cores for vm #{}", vm.id);
            return AllocationVerdict::NotEnoughCores;
        }
        match self.match_cores(&own, &scaled) {
            Some(matched) => {
                self.release_vm(vm.id);
                for idx in &matched {
                    self.cores[*idx].set_status(CoreStatus::Busy);
                }
                self.core_map.insert(vm.id, matched);
                self.granted.insert(vm.id, scaled);
                vm.set_granted_share(scaled);
                debug!(
                    "allocated {} x {} MIPS to vm #{}",
                    scaled.cores, scaled.mips_per_core, vm.id
                );
                AllocationVerdict::Success
            }
            None => {
                debug!("no first-fit core matching for vm #{}", vm.id);
                AllocationVerdict::NotEnoughMips
            }
        }
    }

    fn deallocate(&mut self, vm: &mut VirtualMachine) {
        self.release_vm(vm.id);
        vm.set_granted_share(CpuShare::empty());
    }

    fn deallocate_cores(&mut self, vm: &mut VirtualMachine, cores: u32) -> AllocationVerdict {
        if self.failed {
            return AllocationVerdict::HostFailed;
        }
        if cores == 0 || !self.core_map.contains_key(&vm.id) {
            return AllocationVerdict::InvalidRequest;
        }
        let held = self.core_map.get(&vm.id).unwrap().len() as u32;
        if cores >= held {
            self.deallocate(vm);
            return AllocationVerdict::Success;
        }
        let held_cores = self.core_map.get_mut(&vm.id).unwrap();
        for _ in 0..cores {
            let idx = held_cores.pop().unwrap();
            self.cores[idx].set_status(CoreStatus::Free);
        }
        let share = self.granted.get_mut(&vm.id).unwrap();
        share.cores -= cores;
        vm.set_granted_share(*share);
        AllocationVerdict::Success
    }

    fn is_suitable_for(&self, vm: &VirtualMachine, requested: &CpuShare) -> bool {
        if self.failed || requested.is_empty() {
            return false;
        }
        let factor = vm_capacity_factor(vm, &self.config);
        let scaled = CpuShare::new(requested.cores, requested.mips_per_core * factor);
        let own = self.core_map.get(&vm.id).cloned().unwrap_or_default();
        self.free_working_count(&own) >= scaled.cores as usize && self.match_cores(&own, &scaled).is_some()
    }

    fn granted_share(&self, vm_id: u32) -> CpuShare {
        if self.failed {
            return CpuShare::empty();
        }
        self.granted.get(&vm_id).copied().unwrap_or_else(CpuShare::empty)
    }

    fn available_mips(&self) -> f64 {
        if self.failed {
            return 0.;
        }
        self.cores
            .iter()
            .filter(|core| core.is_free() && core.is_working())
            .map(|core| core.rating())
            .sum()
    }

    fn total_mips(&self) -> f64 {
        if self.failed {
            return 0.;
        }
        self.cores
            .iter()
            .filter(|core| core.is_working())
            .map(|core| core.rating())
            .sum()
    }

    fn set_failed(&mut self, failed: bool) {
        self.failed = failed;
    }

    fn is_failed(&self) -> bool {
        self.failed
    }
}
