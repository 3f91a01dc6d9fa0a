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

//! Registry endpoint resolution.
//!
//! Resolution is best-effort: an empty endpoint means "tag the image with
//! its bare name". Callers must never treat an empty result as fatal.

use std::collections::BTreeMap;

use kube::api::Api;
use kube::Client;
use tracing::debug;

use crate::api::registry::{Registry, LOGIN_URL_ANNOTATION};

/// Looks up Registry objects and extracts their externally reachable
/// endpoint.
pub struct RegistryResolver {
    client: Client,
}

impl RegistryResolver {
    pub fn new(client: Client) -> Self {
        RegistryResolver { client }
    }

    /// Resolves the bare `host[:port]` endpoint of a registry.
    ///
    /// Returns the empty string when either argument is empty, the object
    /// is absent, the lookup fails, or the object carries no login-URL
    /// annotation.
    pub async fn resolve(&self, registry_name: &str, namespace: &str) -> String {
        if registry_name.is_empty() || namespace.is_empty() {
            return String::new();
        }
        let registries: Api<Registry> = Api::namespaced(self.client.clone(), namespace);
        match registries.get(registry_name).await {
            Ok(registry) => endpoint_from_annotations(registry.metadata.annotations.as_ref()),
            Err(error) => {
                debug!(%registry_name, %namespace, %error, "registry lookup failed");
                String::new()
            }
        }
    }
}

/// Extracts the bare endpoint from a registry's annotations, stripping a
/// leading scheme from the login URL.
pub fn endpoint_from_annotations(annotations: Option<&BTreeMap<String, String>>) -> String {
    annotations
        .and_then(|annotations| annotations.get(LOGIN_URL_ANNOTATION))
        .map(|url| strip_scheme(url).to_string())
        .unwrap_or_default()
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(url: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(LOGIN_URL_ANNOTATION.to_string(), url.to_string())])
    }

    #[test]
    fn test_strips_https_scheme() {
        let a = annotations("https://registry.example.com:5000");
        assert_eq!(
            endpoint_from_annotations(Some(&a)),
            "registry.example.com:5000"
        );
    }

    #[test]
    fn test_strips_http_scheme() {
        let a = annotations("http://registry.example.com");
        assert_eq!(endpoint_from_annotations(Some(&a)), "registry.example.com");
    }

    #[test]
    fn test_bare_host_passes_through() {
        // hosts starting with scheme letters must not be mangled
        let a = annotations("host.example.com");
        assert_eq!(endpoint_from_annotations(Some(&a)), "host.example.com");
    }

    #[test]
    fn test_missing_annotation_yields_empty() {
        assert_eq!(endpoint_from_annotations(None), "");
        assert_eq!(endpoint_from_annotations(Some(&BTreeMap::new())), "");
    }
}
