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

//! Binary entry point. Branches into actor-subprocess mode if
//! `PREEMPT_KERNEL_SIM_ACTOR_SUBPROCESS_PID` is set (the OS-process backend
//! re-invokes this same executable as its child); otherwise runs the kernel.

use std::sync::Arc;

use miette::IntoDiagnostic;
use preempt_kernel_sim::{
    actor::{cooperative::{spawn_actor, ActorWorkload}, ActorHandle},
    config::Config,
    interrupt::spawn_simulated,
    operator::{self, OperatorCommand},
    Kernel,
};

fn init_tracing() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .compact()
        .with_max_level(tracing::Level::DEBUG)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| miette::miette!("failed to install tracing subscriber: {e}"))
}

#[cfg(unix)]
fn maybe_run_actor_subprocess() -> miette::Result<()> {
    if let Ok(pid_str) = std::env::var(
        preempt_kernel_sim::actor::process_backend::ACTOR_SUBPROCESS_ENV_VAR,
    ) {
        let pid = preempt_kernel_sim::Pid(pid_str.parse().into_diagnostic()?);
        let max_iterations: u32 = std::env::var("PREEMPT_KERNEL_SIM_ACTOR_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);
        preempt_kernel_sim::actor::process_backend::run_actor_subprocess(pid, max_iterations);
    }
    Ok(())
}

#[cfg(not(unix))]
fn maybe_run_actor_subprocess() -> miette::Result<()> { Ok(()) }

#[tokio::main]
async fn main() -> miette::Result<()> {
    maybe_run_actor_subprocess()?;

    init_tracing()?;
    let config = Config::from_env()?;
    tracing::debug!(?config, "starting simulation");

    let (syscall_tx, syscall_rx) = tokio::sync::mpsc::unbounded_channel();
    let (interrupt_tx, interrupt_rx) = tokio::sync::mpsc::unbounded_channel();
    let (operator_channel, operator_handle) = operator::channel();

    let base_seed = config.rng_seed.unwrap_or_else(|| {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::time::SystemTime::now().hash(&mut hasher);
        hasher.finish()
    });

    let handles: Vec<Arc<dyn ActorHandle>> = (1..=config.num_apps)
        .map(|i| {
            let workload = ActorWorkload {
                max_iterations: config.max_iterations,
                prob_syscall_pct: config.prob_syscall_pct,
                step_delay_ms: config.actor_step_ms,
                rng_seed: base_seed.wrapping_add(u64::from(i)),
            };
            spawn_actor(preempt_kernel_sim::Pid(i), workload, syscall_tx.clone())
        })
        .collect();
    drop(syscall_tx);

    let interrupt_source = spawn_simulated(
        config.timeslice_ms,
        config.prob_irq_d1_pct,
        config.prob_irq_d2_pct,
        base_seed,
        interrupt_tx,
    );

    let console_handle = operator_handle.clone();
    let console_task = tokio::task::spawn_blocking(move || run_operator_console(console_handle));

    let mut kernel = Kernel::new(handles, config.queue_capacity);
    kernel.run(syscall_rx, interrupt_rx, operator_channel).await;

    interrupt_source.stop();
    console_task.abort();

    tracing::info!(
        terminated = kernel.terminated_count(),
        "simulation complete"
    );

    Ok(())
}

/// Reads single-character operator commands from stdin: `i` for inspect, `r` for
/// resume, `q` for quit. Runs on a blocking thread since stdin has no
/// async-native readiness primitive on every platform.
fn run_operator_console(handle: operator::OperatorHandle) {
    let stdin = std::io::stdin();
    for line in std::io::BufRead::lines(stdin.lock()) {
        let Ok(line) = line else { return };
        match line.trim() {
            "i" => handle.request_inspect(),
            "r" => {
                if handle.send_command(OperatorCommand::Resume).is_err() {
                    return;
                }
            }
            "q" => {
                let _ = handle.send_command(OperatorCommand::Quit);
                return;
            }
            other if !other.is_empty() => {
                tracing::warn!(command = other, "unrecognised operator command");
            }
            _ => {}
        }
    }
}
