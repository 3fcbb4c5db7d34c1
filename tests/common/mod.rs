// Copyright (c) 2024 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared test helpers: a trivial [`ActorHandle`] stub that records
//! suspend/resume calls, used by every trace-driven scenario/property test so
//! the kernel's state machine can be exercised without real actor tasks.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use preempt_kernel_sim::{actor::ActorHandle, Kernel};

#[derive(Debug, Default)]
pub struct StubHandle {
    pub suspends: AtomicU32,
    pub resumes: AtomicU32,
    pub terminates: AtomicU32,
}

impl ActorHandle for StubHandle {
    fn suspend(&self) { self.suspends.fetch_add(1, Ordering::SeqCst); }
    fn resume(&self) { self.resumes.fetch_add(1, Ordering::SeqCst); }
    fn terminate(&self) { self.terminates.fetch_add(1, Ordering::SeqCst); }
}

/// Builds a [`Kernel`] with `n` stub-backed PCBs and returns it along with the
/// handles, so a test can inspect suspend/resume counts directly.
#[must_use]
pub fn kernel_with_stubs(n: u32) -> (Kernel, Vec<Arc<StubHandle>>) {
    let stubs: Vec<Arc<StubHandle>> = (0..n).map(|_| Arc::new(StubHandle::default())).collect();
    let handles = stubs
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn ActorHandle>)
        .collect();
    (Kernel::new(handles, n as usize), stubs)
}
