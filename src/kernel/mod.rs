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

//! The kernel aggregate: process table, ready/blocked queues, and the currently
//! running identity. All state lives here and is touched only by the dispatch
//! loop's single execution context — there is no lock because there is no
//! sharing inside the core.

mod dispatch_loop;
mod handlers;
mod scheduler;
mod snapshot;

pub use snapshot::Snapshot;

use std::sync::Arc;

use crate::{
    actor::ActorHandle,
    pcb::{Device, Pcb, ProcessState, Pid},
    queue::FifoQueue,
};

/// Owns the whole process table and scheduling state for one simulation run.
#[derive(Debug)]
pub struct Kernel {
    processes: Vec<Pcb>,
    ready_q: FifoQueue,
    blocked_q_d1: FifoQueue,
    blocked_q_d2: FifoQueue,
    current: Option<Pid>,
    terminated_count: u32,
    num_apps: u32,
}

impl Kernel {
    /// Creates a kernel with one `READY` PCB per handle, enqueued into `ready_q`
    /// in order, so the first `TIMESLICE` promotes handle `0` and round-robin
    /// proceeds in handle order from there.
    #[must_use]
    pub fn new(handles: Vec<Arc<dyn ActorHandle>>, queue_capacity: usize) -> Self {
        let num_apps = u32::try_from(handles.len()).expect("num_apps fits in u32");
        let mut ready_q = FifoQueue::with_capacity(queue_capacity);
        let mut processes = Vec::with_capacity(handles.len());

        for (i, handle) in handles.into_iter().enumerate() {
            let id = Pid(u32::try_from(i).expect("index fits in u32") + 1);
            processes.push(Pcb::new(id, handle));
            ready_q
                .push_tail(id)
                .expect("queue_capacity is sized to num_apps");
        }

        Self {
            processes,
            ready_q,
            blocked_q_d1: FifoQueue::with_capacity(queue_capacity),
            blocked_q_d2: FifoQueue::with_capacity(queue_capacity),
            current: None,
            terminated_count: 0,
            num_apps,
        }
    }

    #[must_use]
    pub fn processes(&self) -> &[Pcb] { &self.processes }

    #[must_use]
    pub fn current(&self) -> Option<Pid> { self.current }

    #[must_use]
    pub fn terminated_count(&self) -> u32 { self.terminated_count }

    #[must_use]
    pub fn num_apps(&self) -> u32 { self.num_apps }

    #[must_use]
    pub fn is_complete(&self) -> bool { self.terminated_count >= self.num_apps }

    #[must_use]
    pub fn ready_len(&self) -> usize { self.ready_q.size() }

    #[must_use]
    pub fn blocked_len(&self, device: Device) -> usize {
        self.blocked_queue(device).size()
    }

    fn find_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        let idx = usize::try_from(pid.0.checked_sub(1)?).ok()?;
        self.processes.get_mut(idx)
    }

    #[must_use]
    pub fn find(&self, pid: Pid) -> Option<&Pcb> {
        let idx = usize::try_from(pid.0.checked_sub(1)?).ok()?;
        self.processes.get(idx)
    }

    fn blocked_queue(&self, device: Device) -> &FifoQueue {
        match device {
            Device::D1 => &self.blocked_q_d1,
            Device::D2 => &self.blocked_q_d2,
        }
    }

    fn blocked_queue_mut(&mut self, device: Device) -> &mut FifoQueue {
        match device {
            Device::D1 => &mut self.blocked_q_d1,
            Device::D2 => &mut self.blocked_q_d2,
        }
    }

    /// Any PCB whose actor has died without posting `TERMINATED` is force-terminated,
    /// so a crashed actor can't leave the kernel waiting on it forever. Called once
    /// per dispatch loop iteration, after draining both channels.
    pub fn reap_zombies(&mut self) {
        let zombies: Vec<Pid> = self
            .processes
            .iter()
            .filter(|p| p.state != ProcessState::Terminated && !p.external_handle.is_alive())
            .map(|p| p.id)
            .collect();

        for pid in zombies {
            tracing::warn!(%pid, "actor died without posting TERMINATED, synthesising termination");
            self.apply_app_message(crate::actor::AppMessage::Terminated { pid });
        }
    }
}
