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

//! Simulator configuration. The CLI surface takes no flags, so every option is a
//! compiled-in default, overridable by an environment variable read once at
//! startup.

use crate::error::KernelError;

/// Recognised options and their defaults.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub num_apps: u32,
    pub max_iterations: u32,
    pub timeslice_ms: u64,
    pub prob_syscall_pct: u8,
    pub prob_irq_d1_pct: u8,
    pub prob_irq_d2_pct: u8,
    pub queue_capacity: usize,
    /// Delay between an actor's own steps; an implementation-only knob for how
    /// "busy" the workload looks, not a scheduling parameter.
    pub actor_step_ms: u64,
    /// If set, seeds every RNG in the simulation deterministically.
    pub rng_seed: Option<u64>,
    /// Self-preemption on an empty `ready_q` at a `TIMESLICE` tick is a strict
    /// no-op; this field documents where a strict tick-aligned-quanta variant
    /// would plug in. The dispatch loop never reads it.
    pub strict_tick_aligned_quanta: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_apps: 5,
            max_iterations: 20,
            timeslice_ms: 500,
            prob_syscall_pct: 10,
            prob_irq_d1_pct: 10,
            prob_irq_d2_pct: 5,
            queue_capacity: 5,
            actor_step_ms: 200,
            rng_seed: None,
            strict_tick_aligned_quanta: false,
        }
    }
}

impl Config {
    /// Builds a [`Config`] from compiled-in defaults, overridden by any of
    /// `SIM_NUM_APPS`, `SIM_MAX_ITERATIONS`, `SIM_TIMESLICE_MS`, `SIM_PROB_SYSCALL`,
    /// `SIM_PROB_IRQ_D1`, `SIM_PROB_IRQ_D2`, `SIM_QUEUE_CAPACITY`,
    /// `SIM_ACTOR_STEP_MS`, and `SIM_RNG_SEED` that are set and parse.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidConfig`] if `num_apps` resolves to zero.
    pub fn from_env() -> Result<Self, KernelError> {
        let mut config = Self::default();

        if let Some(v) = parse_env("SIM_NUM_APPS") {
            config.num_apps = v;
        }
        if let Some(v) = parse_env("SIM_MAX_ITERATIONS") {
            config.max_iterations = v;
        }
        if let Some(v) = parse_env("SIM_TIMESLICE_MS") {
            config.timeslice_ms = v;
        }
        if let Some(v) = parse_env("SIM_PROB_SYSCALL") {
            config.prob_syscall_pct = v;
        }
        if let Some(v) = parse_env("SIM_PROB_IRQ_D1") {
            config.prob_irq_d1_pct = v;
        }
        if let Some(v) = parse_env("SIM_PROB_IRQ_D2") {
            config.prob_irq_d2_pct = v;
        }
        if let Some(v) = parse_env("SIM_QUEUE_CAPACITY") {
            config.queue_capacity = v;
        }
        if let Some(v) = parse_env("SIM_ACTOR_STEP_MS") {
            config.actor_step_ms = v;
        }
        if let Some(v) = parse_env("SIM_RNG_SEED") {
            config.rng_seed = Some(v);
        }

        // `queue_capacity` must hold every process at once, or a fully-loaded
        // ready queue would reject a push and panic on the `expect` in the kernel.
        config.queue_capacity = config.queue_capacity.max(config.num_apps as usize);

        if config.num_apps == 0 {
            return Err(KernelError::InvalidConfig {
                detail: "num_apps must be at least 1",
            });
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = Config::default();
        assert_eq!(config.num_apps, 5);
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.timeslice_ms, 500);
        assert_eq!(config.prob_syscall_pct, 10);
        assert_eq!(config.prob_irq_d1_pct, 10);
        assert_eq!(config.prob_irq_d2_pct, 5);
    }

    #[test]
    fn queue_capacity_floored_at_num_apps() {
        // SAFETY (test-only, serial): env var mutation is scoped to this process
        // and no other test in this module reads SIM_* concurrently.
        unsafe {
            std::env::set_var("SIM_NUM_APPS", "8");
            std::env::set_var("SIM_QUEUE_CAPACITY", "2");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.queue_capacity, 8);
        unsafe {
            std::env::remove_var("SIM_NUM_APPS");
            std::env::remove_var("SIM_QUEUE_CAPACITY");
        }
    }
}
