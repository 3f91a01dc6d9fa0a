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

//! Trustpod Core Library
//!
//! Trustpod provisions short-lived, privileged signing workloads that run
//! docker content trust on behalf of declaratively specified signing
//! intents, and syncs the generated key material back into cluster state.
//!
//! The library is organized around the signing orchestration subsystem:
//!
//! - [`orchestrator`] - lifecycle of one ephemeral signing workload per
//!   operation: creation, readiness wait, command sequencing, teardown
//! - [`commander`] - the exec-in-container command channel and the fixed
//!   command templates used to drive the signing tool
//! - [`workload`] - the pod template for the ephemeral signing workload
//! - [`trust`] - passphrases, trust roles, target naming, and the parser
//!   for the signing tool's key-description output
//! - [`registry`] - registry endpoint resolution
//! - [`api`] - the custom resource types (ImageSigner, SignerKey,
//!   ImageSignRequest, Registry)
//!
//! All cluster access and command transport go through trait seams
//! ([`commander::CommandChannel`], [`orchestrator::WorkloadClient`],
//! [`orchestrator::KeyRecordStore`], [`orchestrator::Clock`]) so the
//! orchestration logic is testable without a live cluster.

pub mod api;
pub mod commander;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod trust;
pub mod workload;

pub use commander::{CommandChannel, Commander, ExecOutput, KubeExecChannel, WorkloadRef};
pub use error::SigningError;
pub use orchestrator::{
    Clock, CommandOptions, CreateOutcome, KeyRecordStore, Phase, SignOutcome, SignParams,
    SigningOrchestrator, TokioClock, WorkloadClient,
};
pub use registry::RegistryResolver;
pub use trust::{Role, TrustPass};
