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

//! Bounded FIFO queues of [`Pid`](crate::pcb::Pid)s — the ready queue and the two
//! per-device blocked queues.
//!
//! Queues store identities, not PCBs; ordering is the scheduler's only fairness
//! mechanism, so this type deliberately offers no reordering or priority
//! operations.

use std::collections::VecDeque;

use crate::pcb::Pid;

/// A bounded FIFO of [`Pid`]s.
#[derive(Debug, Clone)]
pub struct FifoQueue {
    items: VecDeque<Pid>,
    capacity: usize,
}

/// Returned by [`FifoQueue::push_tail`] if the queue is already at capacity.
///
/// Every queue is sized to hold every process at once, so this can only happen
/// if a caller pushes the same [`Pid`] into a queue twice without popping it
/// first, which is itself a state-machine bug — so callers are expected to
/// treat it as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue at capacity ({capacity})")]
pub struct QueueFull {
    pub capacity: usize,
}

impl FifoQueue {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// # Errors
    ///
    /// Returns [`QueueFull`] if the queue is already at its configured capacity.
    pub fn push_tail(&mut self, pid: Pid) -> Result<(), QueueFull> {
        if self.items.len() >= self.capacity {
            return Err(QueueFull {
                capacity: self.capacity,
            });
        }
        self.items.push_back(pid);
        Ok(())
    }

    pub fn pop_head(&mut self) -> Option<Pid> { self.items.pop_front() }

    #[must_use]
    pub fn peek_head(&self) -> Option<Pid> { self.items.front().copied() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    #[must_use]
    pub fn size(&self) -> usize { self.items.len() }

    #[must_use]
    pub fn contains(&self, pid: Pid) -> bool { self.items.contains(&pid) }

    /// Removes the first occurrence of `pid`, wherever it sits in the queue.
    ///
    /// Only used to repair a PCB that a zombie-reap sweep discovers still enqueued
    /// after being force-terminated; normal operation never needs to remove from
    /// the middle of a FIFO.
    pub(crate) fn remove(&mut self, pid: Pid) -> bool {
        if let Some(idx) = self.items.iter().position(|&p| p == pid) {
            self.items.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ { self.items.iter().copied() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> Pid { Pid(n) }

    #[test]
    fn fifo_order_preserved() {
        let mut q = FifoQueue::with_capacity(3);
        q.push_tail(pid(1)).unwrap();
        q.push_tail(pid(2)).unwrap();
        q.push_tail(pid(3)).unwrap();
        assert_eq!(q.pop_head(), Some(pid(1)));
        assert_eq!(q.pop_head(), Some(pid(2)));
        assert_eq!(q.pop_head(), Some(pid(3)));
        assert_eq!(q.pop_head(), None);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut q = FifoQueue::with_capacity(2);
        q.push_tail(pid(1)).unwrap();
        assert_eq!(q.peek_head(), Some(pid(1)));
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn push_past_capacity_errors() {
        let mut q = FifoQueue::with_capacity(1);
        q.push_tail(pid(1)).unwrap();
        assert!(q.push_tail(pid(2)).is_err());
    }

    #[test]
    fn remove_from_middle() {
        let mut q = FifoQueue::with_capacity(3);
        q.push_tail(pid(1)).unwrap();
        q.push_tail(pid(2)).unwrap();
        q.push_tail(pid(3)).unwrap();
        assert!(q.remove(pid(2)));
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![pid(1), pid(3)]);
        assert!(!q.remove(pid(99)));
    }
}
