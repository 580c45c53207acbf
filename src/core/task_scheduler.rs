//! Guest-level scheduler contract.

use crate::core::task::{Task, TaskStatus};
use crate::core::vm::VirtualMachine;

/// Allocates a VM's granted capacity among its tasks and advances their
/// progress over simulated time. One instance exists per VM; the strategy
/// (exclusive core claims or fair sharing) is selected at construction.
///
/// The external event engine drives the scheduler synchronously: it calls
/// [`advance`](TaskScheduler::advance) whenever the VM's grant or task
/// population changes and uses the returned estimate to schedule its next
/// wake-up.
pub trait TaskScheduler {
    /// Adds a task to the lifecycle. The task starts immediately if the
    /// policy admits it, otherwise it queues in arrival order. Returns the
    /// task id.
    fn submit(&mut self, task: Task) -> u64;

    /// Cancels a task, returning its final state. Unknown and
    /// already-terminal ids report "not found" (`None`) without side
    /// effects; canceling twice is a no-op.
    fn cancel(&mut self, task_id: u64) -> Option<Task>;

    /// Pauses a running task, preserving its progress exactly.
    /// Returns `false` for a not-found id.
    fn pause(&mut self, task_id: u64) -> bool;

    /// Resumes a paused task; the finish estimate is recomputed on the
    /// next advance. Returns `false` for a not-found id.
    fn resume(&mut self, task_id: u64) -> bool;

    /// Advances every running task by `elapsed × allocated rate`, moves
    /// completed tasks to the finished list (for all tasks, before any
    /// estimation), recomputes per-task rates against the VM's current
    /// grant and returns the earliest estimated finish time, clamped to at
    /// least `time + min_time_between_events`. Returns `None` when there
    /// is nothing to wake up for. Calling twice at the same time performs
    /// no further progress.
    fn advance(&mut self, time: f64, vm: &VirtualMachine) -> Option<f64>;

    /// Moves every non-terminal task to the failed list. Used when the
    /// host the VM resides on fails.
    fn fail_all(&mut self);

    fn waiting(&self) -> &[Task];
    fn running(&self) -> &[Task];
    fn paused(&self) -> &[Task];
    fn finished(&self) -> &[Task];
    fn failed(&self) -> &[Task];
    fn canceled(&self) -> &[Task];

    /// Returns whether any task is still waiting, running or paused.
    fn has_pending_work(&self) -> bool;
}

/// Lifecycle lists shared by the task scheduling strategies. Every task
/// lives in exactly one list; transitions move the task between lists.
#[derive(Default)]
pub(crate) struct TaskLists {
    pub waiting: Vec<Task>,
    pub running: Vec<Task>,
    pub paused: Vec<Task>,
    pub finished: Vec<Task>,
    pub failed: Vec<Task>,
    pub canceled: Vec<Task>,
}

impl TaskLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_from(list: &mut Vec<Task>, task_id: u64) -> Option<Task> {
        list.iter().position(|task| task.id == task_id).map(|pos| list.remove(pos))
    }

    /// Removes the task from whichever non-terminal list holds it.
    pub fn remove_active(&mut self, task_id: u64) -> Option<Task> {
        Self::remove_from(&mut self.waiting, task_id)
            .or_else(|| Self::remove_from(&mut self.running, task_id))
            .or_else(|| Self::remove_from(&mut self.paused, task_id))
    }

    pub fn fail_active(&mut self) {
        for mut task in self
            .waiting
            .drain(..)
            .chain(self.running.drain(..))
            .chain(self.paused.drain(..))
            .collect::<Vec<_>>()
        {
            task.set_status(TaskStatus::Failed);
            task.set_share(crate::core::common::CpuShare::empty());
            self.failed.push(task);
        }
    }

    pub fn has_pending_work(&self) -> bool {
        !self.waiting.is_empty() || !self.running.is_empty() || !self.paused.is_empty()
    }
}
