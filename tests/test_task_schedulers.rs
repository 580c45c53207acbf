use std::rc::Rc;

use approx::assert_abs_diff_eq;
use sugars::rc;

use cloudsched::core::common::{AllocationVerdict, CpuShare};
use cloudsched::core::config::SimulationConfig;
use cloudsched::core::host_scheduler::HostScheduler;
use cloudsched::core::host_schedulers::space_shared::SpaceSharedHostScheduler;
use cloudsched::core::task::{Task, TaskStatus};
use cloudsched::core::task_scheduler::TaskScheduler;
use cloudsched::core::task_schedulers::space_shared::SpaceSharedTaskScheduler;
use cloudsched::core::task_schedulers::time_shared::TimeSharedTaskScheduler;
use cloudsched::core::vm::VirtualMachine;

fn config() -> Rc<SimulationConfig> {
    let _ = env_logger::builder().is_test(true).try_init();
    rc!(SimulationConfig::default())
}

// Builds a VM holding a real grant from a host scheduler, since granted
// shares are mutated only through the host-level interface.
fn vm_with_grant(cores: u32, mips_per_core: f64, config: Rc<SimulationConfig>) -> VirtualMachine {
    let mut host = SpaceSharedHostScheduler::with_uniform_cores(cores, mips_per_core, config);
    let mut vm = VirtualMachine::new(1, CpuShare::new(cores, mips_per_core));
    assert_eq!(host.allocate_for_vm(&mut vm), AllocationVerdict::Success);
    vm
}

#[test]
// One core of 1000 MIPS shared between two 10000-flops tasks: each runs at
// 500 MIPS, has 5000 flops left at t=10 and finishes at t=20.
fn test_time_shared_fair_share() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = TimeSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 1));
    scheduler.submit(Task::new(2, 10000., 1));

    assert_eq!(scheduler.advance(0., &vm), Some(20.));

    assert_eq!(scheduler.advance(10., &vm), Some(20.));
    for task in scheduler.running() {
        assert_abs_diff_eq!(task.remaining_flops(), 5000., epsilon = 1e-9);
    }

    assert_eq!(scheduler.advance(20., &vm), None);
    assert_eq!(scheduler.finished().len(), 2);
    assert!(!scheduler.has_pending_work());
}

#[test]
// Task of 10000 flops at 1000 MIPS: after advancing to t=2 there are 8000
// flops left; pausing and immediately resuming changes nothing.
fn test_pause_resume_preserves_progress() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = SpaceSharedTaskScheduler::new(config);

    let task_id = scheduler.submit(Task::new(1, 10000., 1));
    assert_eq!(scheduler.advance(0., &vm), Some(10.));

    assert_eq!(scheduler.advance(2., &vm), Some(10.));
    assert_abs_diff_eq!(scheduler.running()[0].remaining_flops(), 8000., epsilon = 1e-9);

    assert!(scheduler.pause(task_id));
    assert_eq!(scheduler.paused()[0].status(), TaskStatus::Paused);
    assert_abs_diff_eq!(scheduler.paused()[0].remaining_flops(), 8000., epsilon = 1e-9);

    assert!(scheduler.resume(task_id));
    assert_abs_diff_eq!(scheduler.running()[0].remaining_flops(), 8000., epsilon = 1e-9);

    assert_eq!(scheduler.advance(2., &vm), Some(10.));
    assert_abs_diff_eq!(scheduler.running()[0].remaining_flops(), 8000., epsilon = 1e-9);

    assert_eq!(scheduler.advance(10., &vm), None);
    assert_eq!(scheduler.finished().len(), 1);
}

#[test]
// Calling advance twice with an unchanged time performs no further
// progress the second time.
fn test_idempotent_noop_advance() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = TimeSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 1));
    scheduler.advance(0., &vm);

    let first = scheduler.advance(5., &vm);
    let done = scheduler.running()[0].flops_done();
    let second = scheduler.advance(5., &vm);
    assert_eq!(first, second);
    assert_eq!(scheduler.running()[0].flops_done(), done);
}

#[test]
// Progress is non-decreasing over any advance sequence and a task reaching
// its full length moves to finished exactly once.
fn test_monotonic_progress_and_single_finish() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = SpaceSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 1));
    scheduler.advance(0., &vm);

    let mut last_done = 0.;
    for time in [1., 3., 3., 7., 10., 15., 20.] {
        scheduler.advance(time, &vm);
        let done = scheduler
            .running()
            .first()
            .map(|task| task.flops_done())
            .unwrap_or_else(|| scheduler.finished()[0].flops_done());
        assert!(done >= last_done);
        last_done = done;
    }
    assert_eq!(scheduler.finished().len(), 1);
    assert_eq!(scheduler.finished()[0].status(), TaskStatus::Finished);
    assert!(scheduler.running().is_empty());
}

#[test]
// With one granted core the second task queues in arrival order and is
// admitted only when the first one finishes.
fn test_space_shared_queueing() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = SpaceSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 1));
    scheduler.submit(Task::new(2, 10000., 1));
    assert_eq!(scheduler.advance(0., &vm), Some(10.));
    assert_eq!(scheduler.running().len(), 1);
    assert_eq!(scheduler.waiting().len(), 1);
    assert_eq!(scheduler.waiting()[0].status(), TaskStatus::Waiting);

    // first task finishes at t=10 and frees the core for the second
    assert_eq!(scheduler.advance(10., &vm), Some(20.));
    assert_eq!(scheduler.finished().len(), 1);
    assert_eq!(scheduler.running().len(), 1);
    assert_eq!(scheduler.running()[0].id, 2);

    assert_eq!(scheduler.advance(20., &vm), None);
    assert_eq!(scheduler.finished().len(), 2);
}

#[test]
// Canceling an unknown or already-terminal id reports "not found" with no
// side effects; canceling twice is a no-op.
fn test_lifecycle_not_found_is_noop() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = TimeSharedTaskScheduler::new(config);

    assert!(scheduler.cancel(42).is_none());
    assert!(!scheduler.pause(42));
    assert!(!scheduler.resume(42));

    let task_id = scheduler.submit(Task::new(1, 10000., 1));
    scheduler.advance(0., &vm);

    let canceled = scheduler.cancel(task_id).unwrap();
    assert_eq!(canceled.status(), TaskStatus::Canceled);
    assert_eq!(scheduler.canceled().len(), 1);

    assert!(scheduler.cancel(task_id).is_none());
    assert_eq!(scheduler.canceled().len(), 1);

    // a finished task cannot be canceled either
    let finished_id = scheduler.submit(Task::new(2, 1000., 1));
    scheduler.advance(1., &vm);
    scheduler.advance(2., &vm);
    assert_eq!(scheduler.finished().len(), 1);
    assert!(scheduler.cancel(finished_id).is_none());
}

#[test]
// Estimates are clamped to at least the engine's minimum time between
// events: 10 flops left at 1000 MIPS would finish in 0.01, but the
// returned estimate is 9.99 + 0.1.
fn test_estimate_clamped_to_min_time_between_events() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = SpaceSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 1));
    scheduler.advance(0., &vm);

    let estimate = scheduler.advance(9.99, &vm).unwrap();
    assert_abs_diff_eq!(estimate, 10.09, epsilon = 1e-9);
}

#[test]
// A VM migrating out delivers only 90% of its granted rate to its tasks.
fn test_migration_out_degrades_service() {
    let config = config();
    let mut vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = TimeSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 9000., 1));
    vm.set_migrating_out(true);
    assert_eq!(scheduler.advance(0., &vm), Some(10.));

    vm.set_migrating_out(false);
    assert_eq!(scheduler.advance(0., &vm), Some(9.));
}

#[test]
// Host failure fails every non-terminal task at once.
fn test_fail_all() {
    let config = config();
    let vm = vm_with_grant(1, 1000., config.clone());
    let mut scheduler = SpaceSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 1));
    scheduler.submit(Task::new(2, 10000., 1));
    scheduler.advance(0., &vm);
    let paused_id = scheduler.running()[0].id;
    scheduler.pause(paused_id);

    scheduler.fail_all();
    assert_eq!(scheduler.failed().len(), 2);
    assert!(scheduler.failed().iter().all(|task| task.status() == TaskStatus::Failed));
    assert!(!scheduler.has_pending_work());
}

#[test]
// Before the first advance the granted capacity is unknown, so submitted
// tasks queue and are admitted by the first advance call.
fn test_submit_before_first_advance_queues() {
    let config = config();
    let vm = vm_with_grant(2, 1000., config.clone());
    let mut scheduler = SpaceSharedTaskScheduler::new(config);

    scheduler.submit(Task::new(1, 10000., 2));
    assert_eq!(scheduler.waiting().len(), 1);

    assert_eq!(scheduler.advance(0., &vm), Some(5.));
    assert_eq!(scheduler.running().len(), 1);
}
