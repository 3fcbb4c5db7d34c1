/*
 *   Copyright (c) 2024 R3BL LLC
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

//! In-process cooperative actor backend.
//!
//! Each application actor is a `tokio` task gated by an atomic "may run" flag plus a
//! [`Notify`], mirroring the suspend/resume semantics of `SIGSTOP`/`SIGCONT` without
//! leaving the process. This is the backend the scenario and property tests in
//! `tests/` drive, because step order is controlled entirely by when the kernel
//! calls [`ActorHandle::resume`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rand::{Rng, SeedableRng};
use tokio::{sync::mpsc, task::AbortHandle};

use super::{ActorHandle, AppMessage};
use crate::pcb::{Device, Operation, Pid};

/// The suspend/resume gate shared between a [`CooperativeHandle`] and its actor task.
#[derive(Debug)]
struct Gate {
    may_run: AtomicBool,
    notify: tokio::sync::Notify,
}

impl Gate {
    fn new() -> Self {
        Self {
            may_run: AtomicBool::new(false),
            notify: tokio::sync::Notify::new(),
        }
    }

    fn suspend(&self) { self.may_run.store(false, Ordering::Release); }

    fn resume(&self) {
        self.may_run.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Blocks until `resume` has been called at least once since the last
    /// `suspend`. Uses the "check, subscribe, check again" pattern to avoid the
    /// missed-wakeup race between the two `may_run` checks.
    async fn wait_until_runnable(&self) {
        loop {
            if self.may_run.load(Ordering::Acquire) {
                return;
            }
            let notified = self.notify.notified();
            if self.may_run.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

/// [`ActorHandle`] for a cooperative in-process actor task.
#[derive(Debug)]
pub struct CooperativeHandle {
    gate: Arc<Gate>,
    abort: AbortHandle,
}

impl ActorHandle for CooperativeHandle {
    fn suspend(&self) { self.gate.suspend(); }

    fn resume(&self) { self.gate.resume(); }

    fn terminate(&self) { self.abort.abort(); }

    fn is_alive(&self) -> bool { !self.abort.is_finished() }
}

/// Parameters governing one actor's synthetic workload, independent of the
/// interrupt controller's own probabilities.
#[derive(Debug, Clone, Copy)]
pub struct ActorWorkload {
    pub max_iterations: u32,
    pub prob_syscall_pct: u8,
    pub step_delay_ms: u64,
    pub rng_seed: u64,
}

/// Spawns one application actor task and returns the handle the kernel will use to
/// control it, plus the receiver side is shared (the caller passes in the sender).
#[must_use]
pub fn spawn_actor(
    pid: Pid,
    workload: ActorWorkload,
    tx: mpsc::UnboundedSender<AppMessage>,
) -> Arc<dyn ActorHandle> {
    let gate = Arc::new(Gate::new());
    let task_gate = Arc::clone(&gate);

    let join = tokio::spawn(async move {
        run_actor_loop(pid, task_gate, workload, tx).await;
    });

    Arc::new(CooperativeHandle {
        gate,
        abort: join.abort_handle(),
    })
}

async fn run_actor_loop(
    pid: Pid,
    gate: Arc<Gate>,
    workload: ActorWorkload,
    tx: mpsc::UnboundedSender<AppMessage>,
) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(workload.rng_seed);
    let mut pc: u32 = 0;

    loop {
        gate.wait_until_runnable().await;

        if pc >= workload.max_iterations {
            let _unused = tx.send(AppMessage::Terminated { pid });
            tracing::debug!(%pid, "actor reached max_iterations, terminating");
            return;
        }

        let roll: u8 = rng.random_range(0..100);
        if roll < workload.prob_syscall_pct {
            let (device, op) = random_syscall(&mut rng);
            tracing::trace!(%pid, ?device, ?op, "actor issuing syscall");
            // Self-suspend before sending, so the kernel can never observe a gap
            // where we're still runnable after the kernel decided we're blocked.
            gate.suspend();
            if tx.send(AppMessage::Syscall { pid, device, op }).is_err() {
                return;
            }
        } else {
            pc += 1;
            if tx.send(AppMessage::Progress { pid, pc }).is_err() {
                return;
            }
        }

        if workload.step_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(workload.step_delay_ms))
                .await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

fn random_syscall(rng: &mut impl Rng) -> (Device, Operation) {
    let device = if rng.random_bool(0.5) {
        Device::D1
    } else {
        Device::D2
    };
    let op = match rng.random_range(0..3) {
        0 => Operation::Read,
        1 => Operation::Write,
        _ => Operation::Exec,
    };
    (device, op)
}
