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

//! Event handlers: the state-machine transitions that move a PCB between
//! `READY`/`RUNNING`/`BLOCKED`/`TERMINATED`. Messages that don't match the sender's
//! actual state (a stale or forged report from an actor) are logged and ignored,
//! never allowed to corrupt the process table or queues.

use crate::{
    actor::AppMessage,
    interrupt::InterruptRecord,
    pcb::{Device, ProcessState, Pid},
};

use super::Kernel;

impl Kernel {
    /// Applies one interrupt-channel record. Public so tests can drive exact
    /// event traces directly against the state machine, without going through
    /// the async dispatch loop.
    pub fn apply_interrupt(&mut self, record: InterruptRecord) {
        match record {
            InterruptRecord::Timeslice => self.schedule_next(),
            InterruptRecord::IoD1 => self.unblock_head(Device::D1),
            InterruptRecord::IoD2 => self.unblock_head(Device::D2),
        }
    }

    fn unblock_head(&mut self, device: Device) {
        let Some(pid) = self.blocked_queue_mut(device).pop_head() else {
            // IO_Dk with an empty blocked queue: nobody to wake, ignore.
            return;
        };
        if let Some(pcb) = self.find_mut(pid) {
            pcb.state = ProcessState::Ready;
            pcb.clear_blocked();
        }
        self.ready_q
            .push_tail(pid)
            .expect("queue_capacity is sized to num_apps");
    }

    /// Applies one syscall-channel message. Public for the same reason as
    /// [`apply_interrupt`](Self::apply_interrupt).
    pub fn apply_app_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Progress { pid, pc } => self.apply_progress(pid, pc),
            AppMessage::Syscall { pid, device, op } => self.apply_syscall(pid, device, op),
            AppMessage::Terminated { pid } => self.apply_terminated(pid),
        }
    }

    fn apply_progress(&mut self, pid: Pid, pc: u32) {
        let Some(pcb) = self.find_mut(pid) else {
            tracing::warn!(%pid, "PROGRESS from unknown pid, ignoring");
            return;
        };
        if pcb.state == ProcessState::Terminated {
            tracing::warn!(%pid, "PROGRESS from terminated pid, ignoring");
            return;
        }
        pcb.pc = pc;
    }

    fn apply_syscall(&mut self, pid: Pid, device: Device, op: crate::pcb::Operation) {
        if self.current != Some(pid) {
            tracing::warn!(%pid, ?device, ?op, "SYSCALL from a pid that is not current, ignoring");
            return;
        }
        let Some(pcb) = self.find_mut(pid) else {
            tracing::warn!(%pid, "SYSCALL from unknown pid, ignoring");
            return;
        };
        if pcb.state != ProcessState::Running {
            tracing::warn!(%pid, state = ?pcb.state, "SYSCALL from a pid not RUNNING, ignoring");
            return;
        }

        // The actor already suspended itself before posting; this call is just
        // keeping the handle's state consistent with the PCB's.
        pcb.external_handle.suspend();
        pcb.enter_blocked(device, op);
        self.current = None;
        self.blocked_queue_mut(device)
            .push_tail(pid)
            .expect("queue_capacity is sized to num_apps");

        self.dispatch_if_idle();
    }

    fn apply_terminated(&mut self, pid: Pid) {
        let Some(pcb) = self.find_mut(pid) else {
            tracing::warn!(%pid, "TERMINATED from unknown pid, ignoring");
            return;
        };
        match pcb.state {
            ProcessState::Terminated => {
                tracing::warn!(%pid, "duplicate TERMINATED, ignoring");
                return;
            }
            ProcessState::Running => {
                if self.current == Some(pid) {
                    self.current = None;
                }
            }
            ProcessState::Ready => {
                self.ready_q.remove(pid);
            }
            ProcessState::Blocked => {
                if let Some(device) = pcb.blocked_device {
                    self.blocked_queue_mut(device).remove(pid);
                }
                if let Some(pcb) = self.find_mut(pid) {
                    pcb.clear_blocked();
                }
            }
        }

        if let Some(pcb) = self.find_mut(pid) {
            pcb.state = ProcessState::Terminated;
            pcb.external_handle.terminate();
        }
        self.terminated_count += 1;
        self.dispatch_if_idle();
    }
}
