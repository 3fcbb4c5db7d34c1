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

//! The async shell that pumps channel reads into the kernel's pure handlers.
//! This is the only part of the kernel that is itself `async`; everything in
//! `scheduler.rs`/`handlers.rs` is synchronous and callable directly from tests.

use tokio::sync::mpsc;

use crate::{
    actor::AppMessage,
    interrupt::InterruptRecord,
    operator::{OperatorChannel, OperatorCommand},
};

use super::Kernel;

impl Kernel {
    /// Runs the dispatch loop to completion: reads both channels, applies
    /// handlers, services operator inspection requests, and exits once every
    /// process has terminated.
    ///
    /// Ordering within one wake-up: syscall-channel records are drained and
    /// applied before interrupt-channel records, so a `RUNNING → BLOCKED`
    /// transition is visible before a concurrent `TIMESLICE` picks a successor.
    pub async fn run(
        &mut self,
        mut syscall_rx: mpsc::UnboundedReceiver<AppMessage>,
        mut interrupt_rx: mpsc::UnboundedReceiver<InterruptRecord>,
        mut operator: OperatorChannel,
    ) {
        while !self.is_complete() {
            tokio::select! {
                biased;

                () = operator.wait_for_inspect() => {
                    self.print_snapshot();
                    match operator.wait_for_command().await {
                        Some(OperatorCommand::Resume) | None => {}
                        Some(OperatorCommand::Quit) => return,
                    }
                }

                msg = syscall_rx.recv() => {
                    let Some(msg) = msg else {
                        tracing::debug!("syscall channel closed, continuing on interrupts only");
                        continue;
                    };
                    self.apply_app_message(msg);
                    self.drain_syscall(&mut syscall_rx);
                    self.drain_interrupt(&mut interrupt_rx);
                }

                record = interrupt_rx.recv() => {
                    let Some(record) = record else {
                        tracing::debug!("interrupt channel closed, continuing on syscalls only");
                        continue;
                    };
                    self.drain_syscall(&mut syscall_rx);
                    self.apply_interrupt(record);
                    self.drain_interrupt(&mut interrupt_rx);
                }
            }

            self.reap_zombies();
        }
    }

    /// Non-blocking drain: applies every syscall-channel record currently
    /// buffered, without awaiting more.
    fn drain_syscall(&mut self, rx: &mut mpsc::UnboundedReceiver<AppMessage>) {
        while let Ok(msg) = rx.try_recv() {
            self.apply_app_message(msg);
        }
    }

    /// Non-blocking drain: applies every interrupt-channel record currently
    /// buffered, without awaiting more.
    fn drain_interrupt(&mut self, rx: &mut mpsc::UnboundedReceiver<InterruptRecord>) {
        while let Ok(record) = rx.try_recv() {
            self.apply_interrupt(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        actor::cooperative::{spawn_actor, ActorWorkload},
        interrupt::ScriptedInterruptSource,
        operator,
        pcb::Pid,
    };

    use super::*;

    #[tokio::test]
    async fn pure_round_robin_terminates_all_three() {
        let (syscall_tx, syscall_rx) = mpsc::unbounded_channel();
        let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
        let (operator_channel, _operator_handle) = operator::channel();

        let workload = ActorWorkload {
            max_iterations: 3,
            prob_syscall_pct: 0,
            step_delay_ms: 0,
            rng_seed: 7,
        };
        let handles: Vec<Arc<dyn crate::actor::ActorHandle>> = (1..=3)
            .map(|i| spawn_actor(Pid(i), workload, syscall_tx.clone()))
            .collect();
        drop(syscall_tx);

        let mut kernel = Kernel::new(handles, 3);
        let scripted = ScriptedInterruptSource::new(interrupt_tx);
        scripted
            .send_all(std::iter::repeat(InterruptRecord::Timeslice).take(9))
            .unwrap();
        drop(scripted);

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            kernel.run(syscall_rx, interrupt_rx, operator_channel),
        )
        .await
        .expect("scenario 1 should complete");

        assert!(kernel.is_complete());
        assert_eq!(kernel.terminated_count(), 3);
    }
}
