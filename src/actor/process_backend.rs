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

//! OS process/signal actor backend (secondary backend).
//!
//! Mirrors the original C program's substrate directly: each actor is a child
//! process, and `suspend`/`resume`/`terminate` map to `SIGSTOP`/`SIGCONT`/`SIGKILL`.
//! The child is this same binary re-invoked in "actor subprocess" mode (see
//! [`run_actor_subprocess`]), writing a fixed-width wire record to its stdout pipe
//! instead of pushing onto an in-process channel.
//!
//! Not exercised by the scenario/property test suite: stopped/continued OS
//! processes don't resume on a schedule precise enough to assert round-robin
//! ordering against, only the cooperative backend in [`super::cooperative`] is.

use std::io::Write;

use nix::{
    sys::signal::{self, Signal},
    unistd::Pid as NixPid,
};
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    sync::mpsc,
};

use super::{ActorHandle, AppMessage};
use crate::pcb::{Device, Operation, Pid};

/// Environment variable that, when set, tells `main` to run in actor-subprocess
/// mode instead of as the kernel. Kept out of the CLI surface on purpose — the
/// primary binary takes no flags.
pub const ACTOR_SUBPROCESS_ENV_VAR: &str = "PREEMPT_KERNEL_SIM_ACTOR_SUBPROCESS_PID";

const WIRE_RECORD_LEN: usize = 1 + 4 + 1 + 4;
const WIRE_TYPE_SYSCALL: u8 = 1;
const WIRE_TYPE_TERMINATED: u8 = 2;
const WIRE_TYPE_PROGRESS: u8 = 3;

fn encode(msg: &AppMessage) -> [u8; WIRE_RECORD_LEN] {
    let mut buf = [0u8; WIRE_RECORD_LEN];
    match *msg {
        AppMessage::Syscall { pid, device, op } => {
            buf[0] = WIRE_TYPE_SYSCALL;
            buf[1..5].copy_from_slice(&pid.0.to_ne_bytes());
            buf[5] = match device {
                Device::D1 => 0,
                Device::D2 => 1,
            };
            let op_code: i32 = match op {
                Operation::Read => 0,
                Operation::Write => 1,
                Operation::Exec => 2,
            };
            buf[6..10].copy_from_slice(&op_code.to_ne_bytes());
        }
        AppMessage::Terminated { pid } => {
            buf[0] = WIRE_TYPE_TERMINATED;
            buf[1..5].copy_from_slice(&pid.0.to_ne_bytes());
            buf[5] = (-1i8) as u8;
            buf[6..10].copy_from_slice(&(-1i32).to_ne_bytes());
        }
        AppMessage::Progress { pid, pc } => {
            buf[0] = WIRE_TYPE_PROGRESS;
            buf[1..5].copy_from_slice(&pid.0.to_ne_bytes());
            buf[5] = (-1i8) as u8;
            #[allow(clippy::cast_possible_wrap)]
            let pc_as_op_field = pc as i32;
            buf[6..10].copy_from_slice(&pc_as_op_field.to_ne_bytes());
        }
    }
    buf
}

/// # Errors
///
/// Returns an error if `buf` is not exactly [`WIRE_RECORD_LEN`] bytes or carries an
/// unrecognised `type` tag.
fn decode(buf: &[u8]) -> Result<AppMessage, crate::error::KernelError> {
    if buf.len() != WIRE_RECORD_LEN {
        return Err(crate::error::KernelError::MalformedRecord {
            expected_len: WIRE_RECORD_LEN,
            actual_len: buf.len(),
        });
    }
    let pid = Pid(u32::from_ne_bytes(buf[1..5].try_into().unwrap()));
    match buf[0] {
        WIRE_TYPE_SYSCALL => {
            let device = if buf[5] == 0 { Device::D1 } else { Device::D2 };
            let op_code = i32::from_ne_bytes(buf[6..10].try_into().unwrap());
            let op = match op_code {
                0 => Operation::Read,
                1 => Operation::Write,
                _ => Operation::Exec,
            };
            Ok(AppMessage::Syscall { pid, device, op })
        }
        WIRE_TYPE_TERMINATED => Ok(AppMessage::Terminated { pid }),
        WIRE_TYPE_PROGRESS => {
            let pc = i32::from_ne_bytes(buf[6..10].try_into().unwrap());
            #[allow(clippy::cast_sign_loss)]
            Ok(AppMessage::Progress {
                pid,
                pc: pc as u32,
            })
        }
        // Reuses `actual_len` to carry the bad type tag; there's no separate
        // "unknown type" variant since both conditions mean "don't trust this record".
        other => Err(crate::error::KernelError::MalformedRecord {
            expected_len: WIRE_RECORD_LEN,
            actual_len: other as usize,
        }),
    }
}

/// [`ActorHandle`] backed by `SIGSTOP`/`SIGCONT`/`SIGKILL` against a child process.
#[derive(Debug)]
pub struct ProcessHandle {
    child_pid: NixPid,
    // Keeps the tokio::process::Child (and its stdout pipe) alive for the handle's
    // lifetime; never read directly, the decode task owns its own stdout handle.
    _child: std::sync::Mutex<Option<Child>>,
}

impl ActorHandle for ProcessHandle {
    fn suspend(&self) {
        if let Err(e) = signal::kill(self.child_pid, Signal::SIGSTOP) {
            tracing::warn!(pid = ?self.child_pid, error = %e, "SIGSTOP failed");
        }
    }

    fn resume(&self) {
        if let Err(e) = signal::kill(self.child_pid, Signal::SIGCONT) {
            tracing::warn!(pid = ?self.child_pid, error = %e, "SIGCONT failed");
        }
    }

    fn terminate(&self) {
        if let Err(e) = signal::kill(self.child_pid, Signal::SIGKILL) {
            tracing::warn!(pid = ?self.child_pid, error = %e, "SIGKILL failed");
        }
    }
}

/// Spawns `exe` (normally `std::env::current_exe()`) in actor-subprocess mode,
/// created stopped, and returns its handle plus a task forwarding its decoded
/// wire records onto `tx`.
///
/// # Errors
///
/// Returns an error if the child process cannot be spawned.
pub fn spawn_process_actor(
    exe: &std::path::Path,
    pid: Pid,
    max_iterations: u32,
    tx: mpsc::UnboundedSender<AppMessage>,
) -> std::io::Result<std::sync::Arc<dyn ActorHandle>> {
    let mut child = Command::new(exe)
        .env(ACTOR_SUBPROCESS_ENV_VAR, pid.0.to_string())
        .env(
            "PREEMPT_KERNEL_SIM_ACTOR_MAX_ITERATIONS",
            max_iterations.to_string(),
        )
        .stdout(std::process::Stdio::piped())
        .spawn()?;

    let child_pid = NixPid::from_raw(
        child
            .id()
            .expect("spawned child always has a pid before it's waited on")
            .try_into()
            .expect("pid fits in pid_t"),
    );
    // Created running; stop it immediately so it starts suspended like every
    // other actor, and only runs once the kernel promotes it.
    let _ = signal::kill(child_pid, Signal::SIGSTOP);

    let stdout = child.stdout.take().expect("stdout was piped");
    tokio::spawn(forward_wire_records(stdout, tx));

    Ok(std::sync::Arc::new(ProcessHandle {
        child_pid,
        _child: std::sync::Mutex::new(Some(child)),
    }))
}

async fn forward_wire_records(
    stdout: tokio::process::ChildStdout,
    tx: mpsc::UnboundedSender<AppMessage>,
) {
    let mut reader = BufReader::new(stdout);
    let mut buf = [0u8; WIRE_RECORD_LEN];
    loop {
        match reader.read_exact(&mut buf).await {
            Ok(_) => match decode(&buf) {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed wire record from actor subprocess");
                }
            },
            Err(_) => return, // pipe closed: child exited.
        }
    }
}

/// Entry point used when [`ACTOR_SUBPROCESS_ENV_VAR`] is set: runs a synthetic
/// workload identical to [`super::cooperative`]'s, but writes each [`AppMessage`]
/// as a wire record to stdout instead of an in-process channel.
pub fn run_actor_subprocess(pid: Pid, max_iterations: u32) -> ! {
    let mut stdout = std::io::stdout().lock();
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(u64::from(pid.0));
    let mut pc: u32 = 0;

    loop {
        if pc >= max_iterations {
            let _unused = stdout.write_all(&encode(&AppMessage::Terminated { pid }));
            let _unused = stdout.flush();
            std::process::exit(0);
        }

        let roll: u8 = rand::Rng::random_range(&mut rng, 0..100);
        let is_syscall = roll < 10;
        let msg = if is_syscall {
            let device = if rand::Rng::random_bool(&mut rng, 0.5) {
                Device::D1
            } else {
                Device::D2
            };
            let op = match rand::Rng::random_range(&mut rng, 0..3) {
                0 => Operation::Read,
                1 => Operation::Write,
                _ => Operation::Exec,
            };
            AppMessage::Syscall { pid, device, op }
        } else {
            pc += 1;
            AppMessage::Progress { pid, pc }
        };

        let _unused = stdout.write_all(&encode(&msg));
        let _unused = stdout.flush();

        if is_syscall {
            // Self-suspend right after posting, so the kernel can never observe
            // this actor still runnable after it's already decided we're blocked.
            let _ = signal::kill(NixPid::this(), Signal::SIGSTOP);
        }

        std::thread::sleep(std::time::Duration::from_millis(200));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_syscall_record() {
        let original = AppMessage::Syscall {
            pid: Pid(3),
            device: Device::D2,
            op: Operation::Exec,
        };
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn round_trips_progress_record() {
        let original = AppMessage::Progress { pid: Pid(1), pc: 7 };
        let decoded = decode(&encode(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_short_record() {
        assert!(decode(&[1, 2, 3]).is_err());
    }
}
