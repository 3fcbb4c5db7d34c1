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

//! Fatal error kinds: malformed wire records and setup/configuration failures.
//! State-machine violations and zombie reaps are recoverable by design and are
//! logged via `tracing::warn!` from `kernel/handlers.rs` instead of being
//! represented here.

/// Errors that abort the simulator rather than being absorbed by the dispatch loop.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum KernelError {
    /// A syscall-channel wire record was the wrong length or carried an
    /// unrecognised type tag (only reachable via the OS-process backend, which is
    /// the only one that actually serialises app messages onto a byte stream).
    #[error("malformed syscall record: expected {expected_len} bytes, got {actual_len}")]
    #[diagnostic(code(preempt_kernel_sim::malformed_record))]
    MalformedRecord {
        expected_len: usize,
        actual_len: usize,
    },

    /// Channel or actor setup failed during startup.
    #[error("failed to set up {what}")]
    #[diagnostic(code(preempt_kernel_sim::setup_failure))]
    SetupFailure {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// `num_apps` was zero, which makes the scheduler's round-robin discipline
    /// meaningless.
    #[error("num_apps must be at least 1")]
    #[diagnostic(code(preempt_kernel_sim::invalid_config))]
    InvalidConfig { detail: &'static str },
}
