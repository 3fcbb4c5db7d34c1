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

//! The operator console's interface to the kernel.
//!
//! The inspect request is the one piece of state genuinely shared across
//! execution contexts (everything else about the kernel is only ever touched by
//! the dispatch loop), so it's a dedicated single-word atomic with
//! acquire/release semantics. It's paired with a [`Notify`](tokio::sync::Notify)
//! purely so the dispatch loop's `select!` can wake immediately on a request
//! instead of polling the flag.

use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};

use tokio::sync::{mpsc, Notify};

/// A command the operator console sends once the kernel is paused for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Resume,
    Quit,
}

/// The kernel-side half of the operator protocol: used from `kernel/dispatch_loop.rs`.
#[derive(Debug)]
pub struct OperatorChannel {
    inspect_requested: Arc<AtomicBool>,
    inspect_notify: Arc<Notify>,
    command_rx: mpsc::UnboundedReceiver<OperatorCommand>,
}

/// The operator-side half: handed to whatever drives "inspect"/"resume"/"quit"
/// (the stdin console in `main.rs`, or a test harness).
#[derive(Debug, Clone)]
pub struct OperatorHandle {
    inspect_requested: Arc<AtomicBool>,
    inspect_notify: Arc<Notify>,
    command_tx: mpsc::UnboundedSender<OperatorCommand>,
}

/// Builds a connected [`OperatorChannel`]/[`OperatorHandle`] pair.
#[must_use]
pub fn channel() -> (OperatorChannel, OperatorHandle) {
    let inspect_requested = Arc::new(AtomicBool::new(false));
    let inspect_notify = Arc::new(Notify::new());
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    (
        OperatorChannel {
            inspect_requested: Arc::clone(&inspect_requested),
            inspect_notify: Arc::clone(&inspect_notify),
            command_rx,
        },
        OperatorHandle {
            inspect_requested,
            inspect_notify,
            command_tx,
        },
    )
}

impl OperatorHandle {
    /// Sets the one-shot inspect flag and wakes the dispatch loop.
    pub fn request_inspect(&self) {
        self.inspect_requested.store(true, Ordering::Release);
        self.inspect_notify.notify_one();
    }

    /// # Errors
    ///
    /// Returns an error if the kernel has already shut down.
    pub fn send_command(
        &self,
        command: OperatorCommand,
    ) -> Result<(), mpsc::error::SendError<OperatorCommand>> {
        self.command_tx.send(command)
    }
}

impl OperatorChannel {
    /// Resolves once [`OperatorHandle::request_inspect`] has been called, clearing
    /// the flag. Safe to call repeatedly; uses the same check-subscribe-check
    /// pattern as the actor gate to avoid missing a request that arrives between
    /// the two flag checks.
    pub async fn wait_for_inspect(&self) {
        loop {
            if self.inspect_requested.swap(false, Ordering::AcqRel) {
                return;
            }
            let notified = self.inspect_notify.notified();
            if self.inspect_requested.swap(false, Ordering::AcqRel) {
                return;
            }
            notified.await;
        }
    }

    /// Blocks until the operator sends a command, for use while paused after a
    /// snapshot — the kernel services nothing else while waiting, since the
    /// snapshot pause is read-only.
    pub async fn wait_for_command(&mut self) -> Option<OperatorCommand> {
        self.command_rx.recv().await
    }
}
