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

//! Version/discovery endpoint: a read-only JSON responder advertising the
//! signer keys sub-resource. Not part of the orchestration core.

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;
use trustpod::api::{API_GROUP, API_VERSION};

const SIGNER_KIND: &str = "imagesigners";

/// Path the version document is served under, derived from the same
/// constants as the advertised groupVersion.
fn version_path() -> String {
    format!("/apis/{API_GROUP}/{API_VERSION}")
}

pub fn router() -> Router {
    Router::new().route(&version_path(), get(version_handler))
}

async fn version_handler() -> Json<Value> {
    Json(json!({
        "kind": "APIResourceList",
        "apiVersion": API_VERSION,
        "groupVersion": format!("{API_GROUP}/{API_VERSION}"),
        "resources": [
            {
                "name": format!("{SIGNER_KIND}/keys"),
                "namespaced": true,
            }
        ],
    }))
}

/// Serves the discovery endpoint until the process exits.
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "discovery endpoint listening");
    axum::serve(listener, router()).await?;
    Ok(())
}
