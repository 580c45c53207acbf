//! Time-shared host scheduler with fractional core sharing.

use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::core::common::{AllocationVerdict, CpuShare};
use crate::core::config::SimulationConfig;
use crate::core::cpu::CpuCore;
use crate::core::host_scheduler::HostScheduler;
use crate::core::migration::vm_capacity_factor;
use crate::core::vm::VirtualMachine;

/// Capacity assembled for one virtual core, together with the draws made
/// against specific physical cores. The draws are kept so that release
/// returns exactly what was taken.
#[derive(Clone, Debug)]
pub(crate) struct SlotGrant {
    pub mips: f64,
    pub draws: Vec<(usize, f64)>,
}

/// Result of planning a spill allocation over a snapshot of free per-core
/// capacity: one grant per requested virtual core plus the total rate that
/// could not be assembled.
#[derive(Debug)]
pub(crate) struct SpillPlan {
    pub slots: Vec<SlotGrant>,
    pub shortfall: f64,
}

impl SpillPlan {
    pub fn assembled_mips(&self) -> f64 {
        self.slots.iter().map(|slot| slot.mips).sum()
    }
}

/// Plans a spill allocation: cores are visited in index order and whatever
/// rate is left on each is drawn until the current virtual core's demand is
/// met or cores run out, then the walk moves to the next virtual core.
/// Virtual cores are served in fixed index order and earlier grants are
/// never rebalanced when a later one finds the remaining cores saturated,
/// so partial grants are order-dependent.
///
/// The function is pure: `free` is an immutable snapshot of
/// `(core index, free MIPS)` pairs and the returned plan is applied
/// atomically by the caller.
pub(crate) fn build_spill_plan(free: &[(usize, f64)], slots: u32, mips_per_slot: f64) -> SpillPlan {
    let mut plan = SpillPlan {
        slots: Vec::with_capacity(slots as usize),
        shortfall: 0.,
    };
    let mut cursor = 0;
    let mut left_on_core = free.first().map(|(_, mips)| *mips).unwrap_or(0.);
    for _ in 0..slots {
        let mut slot = SlotGrant {
            mips: 0.,
            draws: Vec::new(),
        };
        let mut need = mips_per_slot;
        while need > 0. && cursor < free.len() {
            if left_on_core <= 0. {
                cursor += 1;
                if cursor == free.len() {
                    break;
                }
                left_on_core = free[cursor].1;
                continue;
            }
            let draw = need.min(left_on_core);
            slot.draws.push((free[cursor].0, draw));
            slot.mips += draw;
            left_on_core -= draw;
            need -= draw;
        }
        plan.shortfall += need;
        plan.slots.push(slot);
    }
    plan
}

/// Shares each physical core's rate among multiple VMs.
///
/// A single virtual core's demand may be satisfied by accumulating leftover
/// rate across several physical cores. When the full requested rate cannot
/// be matched, the scheduler still grants whatever partial rate it could
/// assemble and logs an under-allocation warning; the aggregate never
/// exceeds the physically available rate.
pub struct TimeSharedHostScheduler {
    cores: Vec<CpuCore>,
    allocated: Vec<f64>,
    grants: IndexMap<u32, Vec<SlotGrant>>,
    failed: bool,
    config: Rc<SimulationConfig>,
}

impl TimeSharedHostScheduler {
    pub fn new(cores: Vec<CpuCore>, config: Rc<SimulationConfig>) -> Self {
        let allocated = vec![0.; cores.len()];
        Self {
            cores,
            allocated,
            grants: IndexMap::new(),
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

    fn working_core_count(&self) -> usize {
        self.cores.iter().filter(|core| core.is_working()).count()
    }

    /// Snapshot of free capacity per working core in index order. Draws of
    /// the given VM are counted as free so that re-allocation is planned
    /// against the state it would see after releasing its current grant.
    fn free_capacity_snapshot(&self, vm_id: u32) -> Vec<(usize, f64)> {
        let mut free: Vec<(usize, f64)> = self
            .cores
            .iter()
            .enumerate()
            .filter(|(_, core)| core.is_working())
            .map(|(idx, core)| (idx, (core.rating() - self.allocated[idx]).max(0.)))
            .collect();
        if let Some(slots) = self.grants.get(&vm_id) {
            for slot in slots {
                for (core_idx, mips) in &slot.draws {
                    if let Some(entry) = free.iter_mut().find(|(idx, _)| idx == core_idx) {
                        entry.1 += mips;
                    }
                }
            }
        }
        free
    }

    fn release_vm(&mut self, vm_id: u32) {
        if let Some(slots) = self.grants.shift_remove(&vm_id) {
            for slot in slots {
                for (core_idx, mips) in slot.draws {
                    self.allocated[core_idx] = (self.allocated[core_idx] - mips).max(0.);
                }
            }
        }
    }

    fn apply_plan(&mut self, vm_id: u32, plan: SpillPlan) -> CpuShare {
        for slot in &plan.slots {
            for (core_idx, mips) in &slot.draws {
                self.allocated[*core_idx] += mips;
            }
        }
        let cores = plan.slots.len() as u32;
        let share = CpuShare::new(cores, plan.assembled_mips() / cores as f64);
        self.grants.insert(vm_id, plan.slots);
        share
    }

    fn granted_mips(&self, vm_id: u32) -> f64 {
        self.grants
            .get(&vm_id)
            .map(|slots| slots.iter().map(|slot| slot.mips).sum())
            .unwrap_or(0.)
    }
}

impl HostScheduler for TimeSharedHostScheduler {
    fn allocate(&mut self, vm: &mut VirtualMachine, requested: &CpuShare) -> AllocationVerdict {
        if self.failed {
            return AllocationVerdict::HostFailed;
        }
        if requested.is_empty() {
            return AllocationVerdict::InvalidRequest;
        }
        let factor = vm_capacity_factor(vm, &self.config);
        let scaled = CpuShare::new(requested.cores, requested.mips_per_core * factor);
        if self.working_core_count() < scaled.cores as usize {
            debug!("not enough working cores for vm #{}", vm.id);
            return AllocationVerdict::NotEnoughCores;
        }
        let free = self.free_capacity_snapshot(vm.id);
        let plan = build_spill_plan(&free, scaled.cores, scaled.mips_per_core);
        if plan.assembled_mips() <= 0. {
            debug!("no spare rate left for vm #{}", vm.id);
            return AllocationVerdict::NotEnoughMips;
        }
        let shortfall = plan.shortfall;
        self.release_vm(vm.id);
        let share = self.apply_plan(vm.id, plan);
        vm.set_granted_share(share);
        if shortfall > 0. {
            warn!(
                "vm #{} under-allocated: granted {} of {} MIPS",
                vm.id,
                share.total_mips(),
                scaled.total_mips()
            );
            AllocationVerdict::PartialSuccess
        } else {
            debug!(
                "allocated {} x {} MIPS to vm #{}",
                share.cores, share.mips_per_core, vm.id
            );
            AllocationVerdict::Success
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
        if cores == 0 || !self.grants.contains_key(&vm.id) {
            return AllocationVerdict::InvalidRequest;
        }
        let held = self.grants.get(&vm.id).unwrap().len() as u32;
        if cores >= held {
            self.deallocate(vm);
            return AllocationVerdict::Success;
        }
        let removed: Vec<SlotGrant> = {
            let slots = self.grants.get_mut(&vm.id).unwrap();
            slots.split_off((held - cores) as usize)
        };
        for slot in removed {
            for (core_idx, mips) in slot.draws {
                self.allocated[core_idx] = (self.allocated[core_idx] - mips).max(0.);
            }
        }
        let left = held - cores;
        let share = CpuShare::new(left, self.granted_mips(vm.id) / left as f64);
        vm.set_granted_share(share);
        AllocationVerdict::Success
    }

    fn is_suitable_for(&self, vm: &VirtualMachine, requested: &CpuShare) -> bool {
        if self.failed || requested.is_empty() {
            return false;
        }
        let factor = vm_capacity_factor(vm, &self.config);
        let scaled = CpuShare::new(requested.cores, requested.mips_per_core * factor);
        self.working_core_count() >= scaled.cores as usize && self.available_mips() >= scaled.total_mips()
    }

    fn granted_share(&self, vm_id: u32) -> CpuShare {
        if self.failed {
            return CpuShare::empty();
        }
        match self.grants.get(&vm_id) {
            Some(slots) => {
                let cores = slots.len() as u32;
                CpuShare::new(cores, self.granted_mips(vm_id) / cores as f64)
            }
            None => CpuShare::empty(),
        }
    }

    fn available_mips(&self) -> f64 {
        if self.failed {
            return 0.;
        }
        self.cores
            .iter()
            .enumerate()
            .filter(|(_, core)| core.is_working())
            .map(|(idx, core)| (core.rating() - self.allocated[idx]).max(0.))
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
