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

//! Process control blocks and the values that appear in them.

use std::{fmt, sync::Arc};

use crate::actor::ActorHandle;

/// Stable kernel-assigned identity of an application actor, `1..=num_apps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "A{}", self.0) }
}

/// One of the two virtual I/O devices a process can block on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Device {
    #[strum(serialize = "D1")]
    D1,
    #[strum(serialize = "D2")]
    D2,
}

/// The syscall operation recorded against a blocked process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Operation {
    #[strum(serialize = "READ")]
    Read,
    #[strum(serialize = "WRITE")]
    Write,
    #[strum(serialize = "EXEC")]
    Exec,
}

/// Lifecycle state of a [`Pcb`]: `READY -> RUNNING -> {BLOCKED, TERMINATED}`, with
/// `BLOCKED -> READY` on the matching device interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Count of completed operations per kind. `read + write + exec` must equal the
/// number of `SYSCALL` messages the kernel has accepted from this PCB (invariant I6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounters {
    pub read: u64,
    pub write: u64,
    pub exec: u64,
}

impl OpCounters {
    pub fn increment(&mut self, op: Operation) {
        match op {
            Operation::Read => self.read += 1,
            Operation::Write => self.write += 1,
            Operation::Exec => self.exec += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 { self.read + self.write + self.exec }
}

/// The kernel's record of one application actor. Created at startup, never
/// reallocated; `state` and its dependent fields move only through the transitions
/// in [`ProcessState`].
pub struct Pcb {
    pub id: Pid,
    pub name: String,
    pub external_handle: Arc<dyn ActorHandle>,
    pub state: ProcessState,
    pub pc: u32,
    pub blocked_device: Option<Device>,
    pub blocked_op: Option<Operation>,
    pub counters: OpCounters,
}

impl Pcb {
    #[must_use]
    pub fn new(id: Pid, external_handle: Arc<dyn ActorHandle>) -> Self {
        Self {
            name: id.to_string(),
            id,
            external_handle,
            state: ProcessState::Ready,
            pc: 0,
            blocked_device: None,
            blocked_op: None,
            counters: OpCounters::default(),
        }
    }

    pub(crate) fn enter_blocked(&mut self, device: Device, op: Operation) {
        self.state = ProcessState::Blocked;
        self.blocked_device = Some(device);
        self.blocked_op = Some(op);
        self.counters.increment(op);
    }

    pub(crate) fn clear_blocked(&mut self) {
        self.blocked_device = None;
        self.blocked_op = None;
    }
}

impl fmt::Debug for Pcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pcb")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("blocked_device", &self.blocked_device)
            .field("blocked_op", &self.blocked_op)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}
