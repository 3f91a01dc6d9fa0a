/*
 *  Copyright 2026 Trustpod Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Error types for the signing orchestration core.
//!
//! Every failure is single-attempt: nothing in the core retries beyond the
//! fixed readiness-poll budget. Retries, if any, come from the reconciliation
//! driver re-running the whole operation on its next trigger.

use thiserror::Error;

/// Errors surfaced by the signing orchestration core.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The ephemeral workload never reached the running phase within the
    /// readiness-poll budget (1s x 60).
    #[error("workload is not running")]
    WorkloadNotReady,

    /// The private-key scan finished without finding a key matching the
    /// requested trust role.
    #[error("key file not found")]
    KeyFileNotFound,

    /// The image archive load produced no image identifiers.
    #[error("image is not found")]
    ImageNotFound,

    /// Command channel failure: transport error, missing stream, or a
    /// non-success exec status. Never retried internally.
    #[error("command execution failed: {0}")]
    Command(String),

    /// Object-store (Kubernetes API) failure.
    #[error("kubernetes api error: {0}")]
    Api(#[from] kube::Error),

    /// The workload delete at the end of an operation failed. Terminal for
    /// the call; the state machine is not resurrected.
    #[error("workload teardown failed: {0}")]
    Teardown(String),
}
