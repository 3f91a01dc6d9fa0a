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

//! The cluster-scoped SignerKey resource: the durable record of generated
//! trust key material for one ImageSigner.
//!
//! There is at most one SignerKey per signer name, enforced by a
//! lookup-before-create check in the signer reconciler rather than a storage
//! constraint. The target table grows monotonically; entries are only added,
//! never removed or overwritten, by the orchestration core.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Key material for one ImageSigner: its root key and a table of per-target
/// keys, keyed by target name (`registryNamespace/registryName/imageName`).
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "trustpod.io",
    version = "v1",
    kind = "SignerKey",
    shortname = "sk"
)]
#[serde(rename_all = "camelCase")]
pub struct SignerKeySpec {
    /// The signer's root key.
    #[serde(default)]
    pub root: TrustKey,
    /// Per-target keys, keyed by target name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TrustKey>,
}

/// One generated trust key: its identifier (the key file name), the literal
/// key-file contents, and the passphrase gating it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrustKey {
    pub id: String,
    pub key: String,
    pub pass_phrase: String,
}

impl TrustKey {
    /// Whether this key carries material that can be seeded into a signing
    /// workload.
    pub fn is_seedable(&self) -> bool {
        !self.id.is_empty() && !self.key.is_empty()
    }
}
