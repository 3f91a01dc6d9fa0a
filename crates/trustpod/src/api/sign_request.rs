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

//! The namespaced ImageSignRequest resource: a one-shot intent to sign a
//! concrete image on behalf of one signer. Consumed exactly once; a request
//! whose status already carries a response is never reprocessed.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of an ImageSignRequest.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "trustpod.io",
    version = "v1",
    kind = "ImageSignRequest",
    status = "ImageSignRequestStatus",
    namespaced,
    shortname = "isr"
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSignRequestSpec {
    /// Name of the ImageSigner to sign on behalf of.
    pub signer: String,
    /// Image reference: a name optionally followed by `:tag`.
    pub image: String,
    /// Registry and credential references for pushing the signed image.
    #[serde(default)]
    pub registry_login: RegistryLogin,
    /// Claim holding the image tarball to load into the signing workload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_name: Option<String>,
}

/// Registry and credential references carried by a sign request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistryLogin {
    /// Name of the Registry object whose endpoint the signed image is
    /// pushed to.
    #[serde(default)]
    pub registry_name: String,
    /// Namespace of the Registry object.
    #[serde(default)]
    pub registry_namespace: String,
    /// Secret holding the dockerconfigjson login credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcj_secret_name: Option<String>,
    /// Secret holding the registry's CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_secret_name: Option<String>,
}

/// Observed state of an ImageSignRequest: the outcome record, written
/// exactly once.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageSignRequestStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_sign_response: Option<SignResponse>,
}

/// Terminal outcome of one sign request.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub result: ResponseResult,
    /// Success note or the failure message, surfaced verbatim.
    pub message: String,
    /// The fully qualified reference the image was signed as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_image: Option<String>,
}

/// Success flag of a sign response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ResponseResult {
    Success,
    Fail,
}

impl SignResponse {
    pub fn success(signed_image: String) -> Self {
        SignResponse {
            result: ResponseResult::Success,
            message: "image signed".to_string(),
            signed_image: Some(signed_image),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        SignResponse {
            result: ResponseResult::Fail,
            message: message.into(),
            signed_image: None,
        }
    }
}
