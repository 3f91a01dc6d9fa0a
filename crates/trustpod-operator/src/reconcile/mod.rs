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

//! Reconciliation drivers: independent control loops reacting to declared
//! signing intents and driving the signing orchestrator.
//!
//! The drivers own retry semantics: nothing here retries inside one
//! invocation; a failed operation is reported on the object's status and
//! the loop re-runs the whole operation on the next observed change.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::Client;
use thiserror::Error;
use tracing::{debug, warn};
use trustpod::api::{ImageSignRequest, ImageSigner};
use trustpod::orchestrator::{KubeKeyRecordStore, KubeWorkloadClient, TokioClock};
use trustpod::{KubeExecChannel, SigningOrchestrator};

use crate::config::Settings;

pub mod sign_request;
pub mod signer;

/// Requeue delay applied by the error policy of both loops.
const ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Shared state of the reconciliation drivers.
pub struct Context {
    pub client: Client,
    pub settings: Settings,
}

impl Context {
    /// Builds an orchestrator for one operation, wired to the live cluster.
    pub fn orchestrator(&self, signer_name: &str, namespace: &str) -> SigningOrchestrator {
        SigningOrchestrator::new(
            Arc::new(KubeWorkloadClient::new(self.client.clone())),
            Arc::new(KubeExecChannel::new(self.client.clone())),
            Arc::new(KubeKeyRecordStore::new(self.client.clone())),
            Arc::new(TokioClock),
            signer_name,
            namespace,
        )
    }
}

/// Driver-level failures. Orchestration errors are reported on object
/// status; only transport errors reach this type, abort the invocation and
/// rely on the error policy's requeue.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Runs both control loops until the process exits.
pub async fn run_controllers(context: Arc<Context>) {
    let signers: Api<ImageSigner> = Api::all(context.client.clone());
    let requests: Api<ImageSignRequest> = Api::all(context.client.clone());

    let signer_loop = Controller::new(signers, watcher::Config::default())
        .run(signer::reconcile, error_policy, context.clone())
        .for_each(log_reconciliation);
    let request_loop = Controller::new(requests, watcher::Config::default())
        .run(sign_request::reconcile, error_policy, context.clone())
        .for_each(log_reconciliation);

    tokio::join!(signer_loop, request_loop);
}

fn error_policy<K>(_object: Arc<K>, error: &ReconcileError, _context: Arc<Context>) -> Action {
    warn!(%error, "reconciliation failed, requeueing");
    Action::requeue(ERROR_REQUEUE)
}

async fn log_reconciliation<O, E>(result: Result<O, E>)
where
    O: std::fmt::Debug,
    E: std::fmt::Display,
{
    match result {
        Ok(object) => debug!(?object, "reconciled"),
        Err(error) => warn!(%error, "reconciliation stream error"),
    }
}
