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

//! The operator status snapshot: a read-only table over the process table and
//! queue sizes, written to stderr and emitted as a single structured `tracing`
//! event.

use std::io::Write;

use crate::pcb::{Device, ProcessState};

use super::Kernel;

/// One row of the status table, captured at the moment of inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRow {
    pub name: String,
    pub state: ProcessState,
    pub pc: u32,
    pub blocked_device: Option<Device>,
    pub blocked_op: Option<crate::pcb::Operation>,
    pub reads: u64,
    pub writes: u64,
    pub execs: u64,
}

/// A full snapshot of the process table and queue sizes, used both for the
/// operator-facing printout and for test assertions (R2: snapshot stability).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub rows: Vec<ProcessRow>,
    pub ready_len: usize,
    pub blocked_d1_len: usize,
    pub blocked_d2_len: usize,
}

impl Kernel {
    /// Builds a read-only snapshot of current kernel state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let rows = self
            .processes
            .iter()
            .map(|p| ProcessRow {
                name: p.name.clone(),
                state: p.state,
                pc: p.pc,
                blocked_device: p.blocked_device,
                blocked_op: p.blocked_op,
                reads: p.counters.read,
                writes: p.counters.write,
                execs: p.counters.exec,
            })
            .collect();

        Snapshot {
            rows,
            ready_len: self.ready_q.size(),
            blocked_d1_len: self.blocked_q_d1.size(),
            blocked_d2_len: self.blocked_q_d2.size(),
        }
    }

    /// Prints the snapshot to stderr as a human-readable table and emits it as a
    /// single structured `tracing` event.
    pub fn print_snapshot(&self) {
        let snapshot = self.snapshot();
        let mut stderr = std::io::stderr();

        let _ = writeln!(
            stderr,
            "{:<6} {:<10} {:>4} {:<4} {:<6} {:>5} {:>6} {:>5}",
            "pid", "state", "pc", "dev", "op", "reads", "writes", "execs"
        );
        for row in &snapshot.rows {
            let _ = writeln!(
                stderr,
                "{:<6} {:<10} {:>4} {:<4} {:<6} {:>5} {:>6} {:>5}",
                row.name,
                row.state.to_string(),
                row.pc,
                row.blocked_device.map_or_else(|| "-".to_string(), |d| d.to_string()),
                row.blocked_op.map_or_else(|| "-".to_string(), |o| o.to_string()),
                row.reads,
                row.writes,
                row.execs,
            );
        }
        let _ = writeln!(
            stderr,
            "ready={} blocked_d1={} blocked_d2={}",
            snapshot.ready_len, snapshot.blocked_d1_len, snapshot.blocked_d2_len
        );

        tracing::info!(
            ready_len = snapshot.ready_len,
            blocked_d1_len = snapshot.blocked_d1_len,
            blocked_d2_len = snapshot.blocked_d2_len,
            rows = ?snapshot.rows,
            "operator snapshot"
        );
    }
}
