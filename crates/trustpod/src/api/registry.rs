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

//! The namespaced Registry resource. Owned and reconciled elsewhere; this
//! operator only reads the login-URL annotation to resolve the externally
//! reachable endpoint signed images are pushed to.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation on a Registry object carrying its externally reachable login
/// URL.
pub const LOGIN_URL_ANNOTATION: &str = "trustpod.io/login-url";

/// Desired state of a Registry. Only metadata is consumed here.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "trustpod.io",
    version = "v1",
    kind = "Registry",
    namespaced,
    shortname = "reg"
)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    /// Human-readable description of the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
