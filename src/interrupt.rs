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

//! The interrupt controller's record type and the two sources that can produce a
//! stream of them.

use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

/// One interrupt record: a timeslice expiry or a device completion. No wire
/// encoding is needed here because the interrupt channel never crosses a process
/// boundary in this implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptRecord {
    Timeslice,
    IoD1,
    IoD2,
}

/// A running interrupt source. Dropping every clone of the sender it holds (via
/// [`stop`](Self::stop)) is how it terminates — a graceful cancel rather than a
/// forceful OS signal, since there is no OS process to signal for the in-process
/// backend.
pub trait InterruptSource: Send + Sync {
    fn stop(&self);
}

struct TaskHandle(tokio::task::AbortHandle);

impl InterruptSource for TaskHandle {
    fn stop(&self) { self.0.abort(); }
}

/// Spawns the default interrupt source: a periodic `TIMESLICE` every
/// `timeslice_ms`, independently rolling `IO_D1` and `IO_D2` after each tick.
#[must_use]
pub fn spawn_simulated(
    timeslice_ms: u64,
    prob_irq_d1_pct: u8,
    prob_irq_d2_pct: u8,
    rng_seed: u64,
    tx: mpsc::UnboundedSender<InterruptRecord>,
) -> Box<dyn InterruptSource> {
    let join = tokio::spawn(async move {
        let mut rng = rand::rngs::StdRng::seed_from_u64(rng_seed);
        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(timeslice_ms));
        // The first tick fires immediately; that's fine, it just means the
        // scheduler gets its first preemption opportunity right away.
        loop {
            interval.tick().await;
            if tx.send(InterruptRecord::Timeslice).is_err() {
                tracing::debug!("interrupt channel closed, stopping interrupt source");
                return;
            }
            if roll_pct(&mut rng, prob_irq_d1_pct) && tx.send(InterruptRecord::IoD1).is_err()
            {
                return;
            }
            if roll_pct(&mut rng, prob_irq_d2_pct) && tx.send(InterruptRecord::IoD2).is_err()
            {
                return;
            }
        }
    });

    Box::new(TaskHandle(join.abort_handle()))
}

fn roll_pct(rng: &mut impl Rng, pct: u8) -> bool {
    if pct == 0 {
        return false;
    }
    rng.random_range(0..100) < pct
}

/// Replays a fixed trace of interrupts, one per call to `tick()` from the driving
/// test, then closes the channel. Used by the hand-authored scenario and boundary
/// tests in `tests/` in place of [`spawn_simulated`]'s wall-clock timer.
#[derive(Debug)]
pub struct ScriptedInterruptSource {
    tx: mpsc::UnboundedSender<InterruptRecord>,
}

impl ScriptedInterruptSource {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<InterruptRecord>) -> Self { Self { tx } }

    /// Sends one interrupt record immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel's receiving end has already been dropped.
    pub fn send(&self, record: InterruptRecord) -> Result<(), mpsc::error::SendError<InterruptRecord>> {
        self.tx.send(record)
    }

    /// Sends a whole trace in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the kernel's receiving end has already been dropped.
    pub fn send_all(
        &self,
        records: impl IntoIterator<Item = InterruptRecord>,
    ) -> Result<(), mpsc::error::SendError<InterruptRecord>> {
        for record in records {
            self.send(record)?;
        }
        Ok(())
    }
}

impl InterruptSource for ScriptedInterruptSource {
    fn stop(&self) {}
}
