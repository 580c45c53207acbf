//! Space-shared task scheduler with exclusive core claims.

use std::rc::Rc;

use log::{debug, trace};

use crate::core::common::CpuShare;
use crate::core::config::SimulationConfig;
use crate::core::migration::vm_service_factor;
use crate::core::task::{Task, TaskStatus};
use crate::core::task_scheduler::{TaskLists, TaskScheduler};
use crate::core::vm::VirtualMachine;

/// Runs a task only while enough of the VM's granted cores are unclaimed
/// by other running tasks; excess tasks queue in arrival order until cores
/// free up via finish, cancel or pause of another task.
pub struct SpaceSharedTaskScheduler {
    lists: TaskLists,
    // effective capacity observed at the last advance, already scaled by
    // the migration service factor
    capacity: CpuShare,
    prev_time: f64,
    config: Rc<SimulationConfig>,
}

impl SpaceSharedTaskScheduler {
    pub fn new(config: Rc<SimulationConfig>) -> Self {
        Self {
            lists: TaskLists::new(),
            capacity: CpuShare::empty(),
            prev_time: 0.,
            config,
        }
    }

    fn cores_in_use(&self) -> u32 {
        self.lists.running.iter().map(|task| task.cores()).sum()
    }

    fn fits(&self, task: &Task) -> bool {
        self.capacity.cores > 0 && self.cores_in_use() + task.cores() <= self.capacity.cores
    }

    fn start_task(&mut self, mut task: Task) {
        task.set_status(TaskStatus::Running);
        task.set_share(CpuShare::new(task.cores(), self.capacity.mips_per_core));
        trace!("task #{} started", task.id);
        self.lists.running.push(task);
    }

    /// Admits queued tasks in arrival order; the first task that does not
    /// fit blocks the rest of the queue.
    fn admit_waiting(&mut self) {
        while let Some(task) = self.lists.waiting.first() {
            if !self.fits(task) {
                break;
            }
            let task = self.lists.waiting.remove(0);
            self.start_task(task);
        }
    }

    /// Refreshes per-task shares after the capacity changed.
    fn refresh_shares(&mut self) {
        let mips_per_core = self.capacity.mips_per_core;
        for task in &mut self.lists.running {
            task.set_share(CpuShare::new(task.cores(), mips_per_core));
        }
    }
}

impl TaskScheduler for SpaceSharedTaskScheduler {
    fn submit(&mut self, task: Task) -> u64 {
        assert!(task.cores() > 0, "task must demand at least one core");
        assert!(task.flops_total() >= 0., "task length cannot be negative");
        let task_id = task.id;
        if self.fits(&task) {
            self.start_task(task);
        } else {
            trace!("task #{} queued", task_id);
            self.lists.waiting.push(task);
        }
        task_id
    }

    fn cancel(&mut self, task_id: u64) -> Option<Task> {
        let mut task = self.lists.remove_active(task_id)?;
        task.set_status(TaskStatus::Canceled);
        task.set_share(CpuShare::empty());
        debug!("task #{} canceled", task_id);
        let snapshot = task.clone();
        self.lists.canceled.push(task);
        self.admit_waiting();
        Some(snapshot)
    }

    fn pause(&mut self, task_id: u64) -> bool {
        match TaskLists::remove_from(&mut self.lists.running, task_id) {
            Some(mut task) => {
                task.set_status(TaskStatus::Paused);
                task.set_share(CpuShare::empty());
                self.lists.paused.push(task);
                self.admit_waiting();
                true
            }
            None => false,
        }
    }

    fn resume(&mut self, task_id: u64) -> bool {
        match TaskLists::remove_from(&mut self.lists.paused, task_id) {
            Some(mut task) => {
                if self.fits(&task) {
                    self.start_task(task);
                } else {
                    task.set_status(TaskStatus::Waiting);
                    self.lists.waiting.push(task);
                }
                true
            }
            None => false,
        }
    }

    fn advance(&mut self, time: f64, vm: &VirtualMachine) -> Option<f64> {
        let elapsed = time - self.prev_time;
        if elapsed > 0. {
            for task in &mut self.lists.running {
                let rate = task.share().total_mips();
                task.add_progress(elapsed * rate);
            }
        }
        // finish detection runs to completion before any estimation
        let mut idx = 0;
        while idx < self.lists.running.len() {
            if self.lists.running[idx].is_completed() {
                let mut task = self.lists.running.remove(idx);
                task.set_status(TaskStatus::Finished);
                task.set_share(CpuShare::empty());
                debug!("task #{} finished at {}", task.id, time);
                self.lists.finished.push(task);
            } else {
                idx += 1;
            }
        }

        let granted = vm.granted_share();
        let factor = vm_service_factor(vm, &self.config);
        self.capacity = CpuShare::new(granted.cores, granted.mips_per_core * factor);
        self.admit_waiting();
        self.refresh_shares();

        let mut next_time: Option<f64> = None;
        for task in &self.lists.running {
            let rate = task.share().total_mips();
            if rate > 0. {
                let estimate = (time + task.remaining_flops() / rate).max(time + self.config.min_time_between_events);
                next_time = Some(next_time.map_or(estimate, |current| current.min(estimate)));
            }
        }
        self.prev_time = self.prev_time.max(time);
        next_time
    }

    fn fail_all(&mut self) {
        self.lists.fail_active();
    }

    fn waiting(&self) -> &[Task] {
        &self.lists.waiting
    }

    fn running(&self) -> &[Task] {
        &self.lists.running
    }

    fn paused(&self) -> &[Task] {
        &self.lists.paused
    }

    fn finished(&self) -> &[Task] {
        &self.lists.finished
    }

    fn failed(&self) -> &[Task] {
        &self.lists.failed
    }

    fn canceled(&self) -> &[Task] {
        &self.lists.canceled
    }

    fn has_pending_work(&self) -> bool {
        self.lists.has_pending_work()
    }
}
