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

//! ImageSignRequest driver: executes the requested signing operation once
//! and records the outcome on the request's status.
//!
//! A request whose status already carries a response is terminal and is
//! never re-executed. Only two failure classes consume a request with a
//! Fail outcome: an absent signer or key record, and an orchestration
//! failure. Transport errors during the lookups propagate instead, so the
//! error policy requeues and a flaky API server never burns a request.

use std::sync::Arc;

use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{info, warn};
use trustpod::api::{ImageSignRequest, ImageSigner, SignResponse, SignerKey};
use trustpod::trust::{build_target_name, parse_image};
use trustpod::{CommandOptions, RegistryResolver, SignParams, SigningError, TrustPass};

use super::{Context, ReconcileError};

pub async fn reconcile(
    request: Arc<ImageSignRequest>,
    context: Arc<Context>,
) -> Result<Action, ReconcileError> {
    if is_consumed(&request) {
        return Ok(Action::await_change());
    }
    let Some(namespace) = request.namespace() else {
        warn!(request = %request.name_any(), "request carries no namespace, skipping");
        return Ok(Action::await_change());
    };
    let name = request.name_any();
    let signer_name = &request.spec.signer;

    let signers: Api<ImageSigner> = Api::all(context.client.clone());
    let records: Api<SignerKey> = Api::all(context.client.clone());

    let response = if signers.get_opt(signer_name).await?.is_none() {
        warn!(request = %name, signer = %signer_name, "image signer not found");
        signer_missing(signer_name)
    } else if let Some(record) = records.get_opt(signer_name).await? {
        match sign(&request, &record, &namespace, &context).await {
            Ok(signed_image) => {
                info!(request = %name, image = %signed_image, "image signed");
                SignResponse::success(signed_image)
            }
            Err(error) => {
                warn!(request = %name, %error, "signing failed");
                SignResponse::failure(error.to_string())
            }
        }
    } else {
        warn!(request = %name, signer = %signer_name, "signer key not found");
        key_missing(signer_name)
    };

    let requests: Api<ImageSignRequest> = Api::namespaced(context.client.clone(), &namespace);
    let patch = serde_json::json!({ "status": { "imageSignResponse": response } });
    requests
        .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(Action::await_change())
}

/// Fail outcome for a request referencing an ImageSigner that does not
/// exist. Only a confirmed absence produces this; lookup transport errors
/// propagate to the caller instead.
fn signer_missing(signer_name: &str) -> SignResponse {
    SignResponse::failure(format!("image signer {signer_name} not found"))
}

/// Fail outcome for a signer that exists but owns no SignerKey record yet.
fn key_missing(signer_name: &str) -> SignResponse {
    SignResponse::failure(format!("signer key {signer_name} not found"))
}

/// Whether the request already carries its one-shot outcome.
fn is_consumed(request: &ImageSignRequest) -> bool {
    request
        .status
        .as_ref()
        .and_then(|status| status.image_sign_response.as_ref())
        .is_some()
}

/// Runs the whole operation and returns the signed image reference. Any
/// orchestration error becomes the failure message on the request's status.
async fn sign(
    request: &ImageSignRequest,
    record: &SignerKey,
    namespace: &str,
    context: &Context,
) -> Result<String, SigningError> {
    let spec = &request.spec;
    let (image_name, image_tag) = parse_image(&spec.image);
    let login = &spec.registry_login;
    let target_name = build_target_name(&login.registry_name, &login.registry_namespace, &image_name);
    let endpoint = RegistryResolver::new(context.client.clone())
        .resolve(&login.registry_name, &login.registry_namespace)
        .await;

    let (pass, added) = TrustPass::for_record(&record.spec, &target_name);
    let options = CommandOptions {
        root_key: Some(record.spec.root.clone()),
        target_key: record.spec.targets.get(&target_name).cloned(),
        dcj_secret_name: login.dcj_secret_name.clone(),
        cert_secret_name: login.cert_secret_name.clone(),
        pvc_name: spec.pvc_name.clone(),
    };
    let params = SignParams {
        image_name,
        image_tag,
        registry_endpoint: endpoint,
        collect_target_key: added,
    };

    let mut orchestrator = context.orchestrator(&spec.signer, namespace);
    let outcome = orchestrator
        .sign_image(record, &target_name, &pass, &options, &params)
        .await?;
    Ok(outcome.signed_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustpod::api::{ImageSignRequestSpec, ImageSignRequestStatus};

    fn request() -> ImageSignRequest {
        ImageSignRequest::new(
            "req",
            ImageSignRequestSpec {
                signer: "dev".to_string(),
                image: "app:1.0".to_string(),
                registry_login: Default::default(),
                pvc_name: None,
            },
        )
    }

    #[test]
    fn test_request_without_response_is_not_consumed() {
        assert!(!is_consumed(&request()));

        let mut pending = request();
        pending.status = Some(ImageSignRequestStatus {
            image_sign_response: None,
        });
        assert!(!is_consumed(&pending));
    }

    #[test]
    fn test_request_with_response_is_consumed() {
        let mut done = request();
        done.status = Some(ImageSignRequestStatus {
            image_sign_response: Some(SignResponse::success("r.example.com/app:1.0".to_string())),
        });
        assert!(is_consumed(&done));

        let mut failed = request();
        failed.status = Some(ImageSignRequestStatus {
            image_sign_response: Some(SignResponse::failure("workload is not running")),
        });
        assert!(is_consumed(&failed));
    }

    #[test]
    fn test_missing_dependency_outcomes_are_fail_and_distinct() {
        use trustpod::api::ResponseResult;

        let signer = signer_missing("dev");
        let key = key_missing("dev");
        assert_eq!(signer.result, ResponseResult::Fail);
        assert_eq!(key.result, ResponseResult::Fail);
        assert_ne!(signer.message, key.message);
        assert!(signer.message.contains("dev"));
        assert!(key.message.contains("dev"));
    }
}
