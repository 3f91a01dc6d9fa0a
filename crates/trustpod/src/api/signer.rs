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

//! The cluster-scoped ImageSigner resource: a declared intent to support
//! signing for one logical signer. The orchestration core never mutates its
//! spec; the status is the sole field it writes.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of an ImageSigner. Purely descriptive; key material is
/// generated by the signer reconciler and stored in a SignerKey of the same
/// name.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "trustpod.io",
    version = "v1",
    kind = "ImageSigner",
    status = "ImageSignerStatus",
    shortname = "signer"
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSignerSpec {
    /// Human-readable description of the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Contact for the team owning this signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Observed state of an ImageSigner; written once key material exists (or
/// its creation failed).
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageSignerStatus {
    /// Whether a SignerKey with root key material exists for this signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    /// Failure message from the last root-key creation attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Identifier of the generated root key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_key_id: Option<String>,
}
