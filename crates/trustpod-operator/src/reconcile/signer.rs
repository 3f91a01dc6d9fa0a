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

//! ImageSigner driver: makes sure every signer owns a SignerKey record
//! carrying a generated root key.
//!
//! The key record is named after the signer, so existence of the record is
//! the idempotency check. When the record is missing, one ephemeral signing
//! workload is driven to generate the root key, and the outcome is written
//! to the signer's status.

use std::sync::Arc;

use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{info, warn};
use trustpod::api::{ImageSigner, ImageSignerStatus, SignerKey};
use trustpod::{CommandOptions, TrustPass};

use super::{Context, ReconcileError};

pub async fn reconcile(
    signer: Arc<ImageSigner>,
    context: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let name = signer.name_any();
    let records: Api<SignerKey> = Api::all(context.client.clone());

    if records.get_opt(&name).await?.is_some() {
        let created = signer.status.as_ref().and_then(|status| status.created);
        if created != Some(true) {
            mark(
                &context,
                &name,
                ImageSignerStatus {
                    created: Some(true),
                    message: None,
                    root_key_id: None,
                },
            )
            .await?;
        }
        return Ok(Action::await_change());
    }

    info!(signer = %name, "no key record, generating root key");
    let pass = TrustPass::generate();
    let mut orchestrator = context.orchestrator(&name, &context.settings.namespace);
    let options = CommandOptions::default();

    let status = match orchestrator.create_root_key(&signer, &pass, &options).await {
        Ok(root_key) => {
            info!(signer = %name, key_id = %root_key.id, "root key created");
            ImageSignerStatus {
                created: Some(true),
                message: None,
                root_key_id: Some(root_key.id),
            }
        }
        Err(error) => {
            warn!(signer = %name, %error, "root key creation failed");
            ImageSignerStatus {
                created: Some(false),
                message: Some(error.to_string()),
                root_key_id: None,
            }
        }
    };
    mark(&context, &name, status).await?;

    Ok(Action::await_change())
}

async fn mark(
    context: &Context,
    name: &str,
    status: ImageSignerStatus,
) -> Result<(), ReconcileError> {
    let signers: Api<ImageSigner> = Api::all(context.client.clone());
    let patch = serde_json::json!({ "status": status });
    signers
        .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}
