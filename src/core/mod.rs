pub mod common;
pub mod config;
pub mod cpu;
pub mod host_scheduler;
pub mod host_schedulers;
pub mod migration;
pub mod task;
pub mod task_scheduler;
pub mod task_schedulers;
pub mod vm;
