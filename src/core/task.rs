//! Work units executed by virtual machines.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::common::CpuShare;

/// Lifecycle status of a task. A task belongs to exactly one lifecycle list
/// at any instant; terminal tasks (finished, failed, canceled) are
/// immutable history.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum TaskStatus {
    Waiting,
    Running,
    Paused,
    Finished,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed | TaskStatus::Canceled)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TaskStatus::Waiting => write!(f, "waiting"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Finished => write!(f, "finished"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// A unit of application work with a total length in floating-point
/// operations. Progress is driven by the rate allocated to the task by the
/// guest-level scheduler of the VM it runs on.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: u64,
    flops_total: f64,
    flops_done: f64,
    cores: u32,
    status: TaskStatus,
    share: CpuShare,
}

impl Task {
    /// Creates a task in the waiting state with no capacity allocated.
    pub fn new(id: u64, flops_total: f64, cores: u32) -> Self {
        Self {
            id,
            flops_total,
            flops_done: 0.,
            cores,
            status: TaskStatus::Waiting,
            share: CpuShare::empty(),
        }
    }

    pub fn flops_total(&self) -> f64 {
        self.flops_total
    }

    pub fn flops_done(&self) -> f64 {
        self.flops_done
    }

    pub fn remaining_flops(&self) -> f64 {
        (self.flops_total - self.flops_done).max(0.)
    }

    pub fn is_completed(&self) -> bool {
        self.flops_done >= self.flops_total
    }

    /// Number of cores the task demands.
    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Share currently allocated to the task by the guest-level scheduler.
    pub fn share(&self) -> CpuShare {
        self.share
    }

    pub(crate) fn add_progress(&mut self, flops: f64) {
        self.flops_done += flops;
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn set_share(&mut self, share: CpuShare) {
        self.share = share;
    }
}
