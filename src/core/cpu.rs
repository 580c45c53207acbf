//! Physical processing cores.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Status of a physical core.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum CoreStatus {
    Free,
    Busy,
    Failed,
}

impl Display for CoreStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CoreStatus::Free => write!(f, "free"),
            CoreStatus::Busy => write!(f, "busy"),
            CoreStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One physical processing core with a fixed rate in MIPS.
///
/// Cores are created with the host and owned exclusively by its scheduler.
#[derive(Clone, Debug, Serialize)]
pub struct CpuCore {
    rating: f64,
    status: CoreStatus,
}

impl CpuCore {
    /// Creates a free core with the given rate in MIPS.
    pub fn new(rating: f64) -> Self {
        Self {
            rating,
            status: CoreStatus::Free,
        }
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn status(&self) -> CoreStatus {
        self.status
    }

    /// A core is working unless it is failed.
    pub fn is_working(&self) -> bool {
        self.status != CoreStatus::Failed
    }

    pub fn is_free(&self) -> bool {
        self.status == CoreStatus::Free
    }

    /// Marks the core as permanently failed.
    pub fn set_failed(&mut self) {
        self.status = CoreStatus::Failed;
    }

    pub(crate) fn set_status(&mut self, status: CoreStatus) {
        self.status = status;
    }
}
