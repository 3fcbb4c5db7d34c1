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

//! Pure scheduling policy: round-robin preemption on a timeslice tick and
//! promotion of the ready-queue head whenever the CPU goes idle. Neither function
//! here ever blocks or runs in the background; both are called from event handlers.

use crate::pcb::ProcessState;

use super::Kernel;

impl Kernel {
    /// Preempts the running PCB (if any and if another is ready) and selects a
    /// successor. Called on `TIMESLICE`.
    pub(crate) fn schedule_next(&mut self) {
        if let Some(cur) = self.current {
            if self.ready_q.is_empty() {
                // Nothing else is ready: a preempt-then-reschedule here
                // would be observationally identical but would needlessly toggle
                // the external actor. Leave it running.
                return;
            }
            if let Some(pcb) = self.find_mut(cur) {
                if pcb.state == ProcessState::Running {
                    pcb.external_handle.suspend();
                    pcb.state = ProcessState::Ready;
                    self.current = None;
                    self.ready_q
                        .push_tail(cur)
                        .expect("queue_capacity is sized to num_apps");
                }
            }
        }

        self.promote_head_if_idle();
    }

    /// If the CPU is idle and someone is ready, promote the head of `ready_q` to
    /// `RUNNING`. Called after a syscall block or a termination.
    pub(crate) fn dispatch_if_idle(&mut self) { self.promote_head_if_idle(); }

    fn promote_head_if_idle(&mut self) {
        if self.current.is_some() {
            return;
        }
        let Some(pid) = self.ready_q.pop_head() else {
            return;
        };
        if let Some(pcb) = self.find_mut(pid) {
            pcb.state = ProcessState::Running;
            pcb.external_handle.resume();
            self.current = Some(pid);
        }
    }
}
