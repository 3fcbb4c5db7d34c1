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

//! The external-actor control protocol and the two backends that implement it.
//!
//! The kernel only ever talks to an actor through an [`ActorHandle`] and receives
//! [`AppMessage`]s on a channel; it never spawns or otherwise knows how an actor's
//! workload runs. Swapping the backend (cooperative in-process tasks vs. OS
//! processes) never touches `kernel/`.

pub mod cooperative;
#[cfg(unix)]
pub mod process_backend;

use std::fmt::Debug;

use crate::pcb::{Device, Operation, Pid};

/// A message an application actor posts on the shared syscall channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMessage {
    /// The actor advanced its program counter without blocking.
    Progress { pid: Pid, pc: u32 },
    /// The actor issued a syscall and has already self-suspended.
    Syscall {
        pid: Pid,
        device: Device,
        op: Operation,
    },
    /// The actor reached `max_iterations` and exited.
    Terminated { pid: Pid },
}

/// Kernel-side control surface for one application actor.
///
/// Every method is non-blocking: the dispatch loop's only suspension point is the
/// channel readiness wait, never a control call.
pub trait ActorHandle: Debug + Send + Sync {
    /// Guarantees no further observable step until [`resume`](Self::resume).
    /// Idempotent for an already-suspended actor.
    fn suspend(&self);

    /// Reverses [`suspend`](Self::suspend). Idempotent for an already-running actor.
    fn resume(&self);

    /// Best-effort forced stop, used only during kernel shutdown cleanup.
    fn terminate(&self);

    /// Whether the underlying actor is still alive. Used by the zombie-reap sweep
    /// to detect an actor that died without posting `TERMINATED`. Backends that
    /// cannot cheaply answer this default to `true`.
    fn is_alive(&self) -> bool { true }
}
