// Copyright (c) 2024 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Boundary cases and idempotence/round-trip checks.

mod common;

use preempt_kernel_sim::{
    actor::{
        cooperative::{spawn_actor, ActorWorkload},
        AppMessage,
    },
    interrupt::InterruptRecord,
    pcb::{Device, Operation},
    Pid, ProcessState,
};

use common::kernel_with_stubs;

/// B1 — `num_apps = 1`: the single actor is preempted at each tick but
/// re-selected immediately; it must never observably stop.
#[test]
fn b1_single_app_never_observably_stops() {
    let (mut k, stubs) = kernel_with_stubs(1);
    k.apply_interrupt(InterruptRecord::Timeslice);
    assert_eq!(k.current(), Some(Pid(1)));
    let resumes_after_first = stubs[0].resumes.load(std::sync::atomic::Ordering::SeqCst);

    for _ in 0..5 {
        k.apply_interrupt(InterruptRecord::Timeslice);
        assert_eq!(k.current(), Some(Pid(1)), "must stay current, no observable stop");
    }
    // No further suspend/resume pair should have been issued: ready_q stayed
    // empty the whole time, so schedule_next's edge case must have no-op'd.
    assert_eq!(
        stubs[0].resumes.load(std::sync::atomic::Ordering::SeqCst),
        resumes_after_first
    );
    assert_eq!(stubs[0].suspends.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// B2 — all actors blocked on the same device with no `IO_Dk`: the kernel has
/// nothing to dispatch; `current` stays unset and no queue changes.
#[test]
fn b2_all_blocked_with_no_interrupt_leaves_kernel_idle() {
    let (mut k, _stubs) = kernel_with_stubs(2);
    k.apply_interrupt(InterruptRecord::Timeslice); // A1 running
    k.apply_app_message(AppMessage::Syscall {
        pid: Pid(1),
        device: Device::D1,
        op: Operation::Read,
    });
    // A2 is now current; block it too.
    k.apply_app_message(AppMessage::Syscall {
        pid: Pid(2),
        device: Device::D1,
        op: Operation::Read,
    });

    assert_eq!(k.current(), None);
    assert_eq!(k.blocked_len(Device::D1), 2);

    let before = k.snapshot();
    // No IO_D1 arrives; an unrelated IO_D2 interrupt changes nothing.
    k.apply_interrupt(InterruptRecord::IoD2);
    let after = k.snapshot();
    pretty_assertions::assert_eq!(before, after);
}

/// B3 — a `TIMESLICE` landing in the window between a `SYSCALL` and its
/// `dispatch_if_idle` must not doubly-set `current`. In this synchronous API
/// there is no such window (handlers run to completion before the next event is
/// applied), so this asserts the invariant holds across the two calls in sequence.
#[test]
fn b3_timeslice_after_syscall_does_not_double_dispatch() {
    let (mut k, _stubs) = kernel_with_stubs(2);
    k.apply_interrupt(InterruptRecord::Timeslice);
    k.apply_app_message(AppMessage::Syscall {
        pid: Pid(1),
        device: Device::D1,
        op: Operation::Read,
    });
    assert_eq!(k.current(), Some(Pid(2)));

    k.apply_interrupt(InterruptRecord::Timeslice);
    // Only A2 is ready to run; ready_q is empty, so preemption is a no-op.
    assert_eq!(k.current(), Some(Pid(2)));
    let running_count = k
        .processes()
        .iter()
        .filter(|p| p.state == ProcessState::Running)
        .count();
    assert_eq!(running_count, 1);
}

/// R1 — applying `suspend` twice is indistinguishable from applying it once:
/// driven against the real cooperative backend, not a stand-in counter.
#[tokio::test]
async fn r1_suspend_is_idempotent() {
    let workload = ActorWorkload {
        max_iterations: 5,
        prob_syscall_pct: 0,
        step_delay_ms: 50,
        rng_seed: 9,
    };

    let (tx_once, mut rx_once) = tokio::sync::mpsc::unbounded_channel();
    let once = spawn_actor(Pid(1), workload, tx_once);
    let (tx_twice, mut rx_twice) = tokio::sync::mpsc::unbounded_channel();
    let twice = spawn_actor(Pid(1), workload, tx_twice);

    once.resume();
    twice.resume();
    assert!(matches!(
        rx_once.recv().await.unwrap(),
        AppMessage::Progress { pc: 1, .. }
    ));
    assert!(matches!(
        rx_twice.recv().await.unwrap(),
        AppMessage::Progress { pc: 1, .. }
    ));

    once.suspend();
    twice.suspend();
    twice.suspend();

    // Give both actors a full step period to (wrongly) make more progress if
    // suspend weren't idempotent, then confirm neither produced anything.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert!(rx_once.try_recv().is_err());
    assert!(rx_twice.try_recv().is_err());

    once.resume();
    twice.resume();
    let next_once = tokio::time::timeout(std::time::Duration::from_millis(500), rx_once.recv())
        .await
        .expect("once-suspended actor should resume")
        .unwrap();
    let next_twice = tokio::time::timeout(std::time::Duration::from_millis(500), rx_twice.recv())
        .await
        .expect("twice-suspended actor should resume identically")
        .unwrap();
    assert!(matches!(next_once, AppMessage::Progress { pc: 2, .. }));
    assert!(matches!(next_twice, AppMessage::Progress { pc: 2, .. }));
}

/// R2 — snapshot, resume, snapshot again on an empty event trace yields
/// identical tables.
#[test]
fn r2_snapshot_resume_snapshot_is_stable() {
    let (mut k, _stubs) = kernel_with_stubs(3);
    k.apply_interrupt(InterruptRecord::Timeslice);
    k.apply_app_message(AppMessage::Progress { pid: Pid(1), pc: 1 });

    let snap1 = k.snapshot();
    // "resume" here is the operator resuming after inspection; on an empty
    // trace nothing else happens before the next snapshot.
    let snap2 = k.snapshot();
    pretty_assertions::assert_eq!(snap1, snap2);
}
