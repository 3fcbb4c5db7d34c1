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

//! A user-space simulator of a preemptive round-robin kernel scheduler.
//!
//! The [`kernel`] module is the core: a process table, a ready queue, two
//! per-device blocked queues, and a dispatch loop that multiplexes an interrupt
//! source and a pool of application actors. Everything else in this crate is the
//! ambient machinery that makes that core runnable: actor backends ([`actor`]),
//! the interrupt controller ([`interrupt`]), configuration ([`config`]), the
//! operator console protocol ([`operator`]), and error types ([`error`]).

pub mod actor;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod kernel;
pub mod operator;
pub mod pcb;
pub mod queue;

pub use config::Config;
pub use error::KernelError;
pub use kernel::{Kernel, Snapshot};
pub use pcb::{Device, OpCounters, Operation, Pcb, ProcessState, Pid};
