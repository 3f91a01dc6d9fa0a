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

//! Process configuration: CLI flags plus in-cluster defaults.
//!
//! The operator namespace resolves, in order, from the CLI flag, the
//! service-account-mounted namespace file, the `NAMESPACE` environment
//! variable, and finally a literal default. The advertised service name
//! comes from `OPERATOR_SERVICE_NAME` or its default.

use std::net::SocketAddr;

use clap::Parser;

const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_SERVICE_NAME: &str = "trustpod";

/// Command-line interface of the trustpod operator.
#[derive(Parser, Debug)]
#[command(
    name = "trustpod-operator",
    about = "Signs container images in ephemeral privileged workloads and manages the resulting trust keys"
)]
pub struct Cli {
    /// Address of the version/discovery endpoint.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Namespace for ephemeral signing workloads; defaults to the
    /// operator's own namespace.
    #[arg(long)]
    pub namespace: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Namespace ephemeral signing workloads run in when a request carries
    /// none of its own.
    pub namespace: String,
    /// Service name this operator is advertised under.
    pub service_name: String,
    pub listen_addr: SocketAddr,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Settings {
            namespace: resolve_namespace(cli.namespace.clone()),
            service_name: service_name(),
            listen_addr: cli.listen_addr,
        }
    }
}

/// Resolves the operator namespace from the available sources.
pub fn resolve_namespace(cli_override: Option<String>) -> String {
    let file = std::fs::read_to_string(SERVICE_ACCOUNT_NAMESPACE_FILE)
        .ok()
        .map(|contents| contents.trim().to_string());
    let env = std::env::var("NAMESPACE").ok();
    pick_namespace(cli_override, file, env)
}

/// The service name this operator is advertised under.
pub fn service_name() -> String {
    std::env::var("OPERATOR_SERVICE_NAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string())
}

fn pick_namespace(
    cli_override: Option<String>,
    service_account_file: Option<String>,
    env: Option<String>,
) -> String {
    cli_override
        .filter(|namespace| !namespace.is_empty())
        .or_else(|| service_account_file.filter(|namespace| !namespace.is_empty()))
        .or_else(|| env.filter(|namespace| !namespace.is_empty()))
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override_wins() {
        assert_eq!(
            pick_namespace(
                Some("explicit".to_string()),
                Some("in-cluster".to_string()),
                Some("from-env".to_string())
            ),
            "explicit"
        );
    }

    #[test]
    fn test_service_account_file_beats_env() {
        assert_eq!(
            pick_namespace(
                None,
                Some("in-cluster".to_string()),
                Some("from-env".to_string())
            ),
            "in-cluster"
        );
    }

    #[test]
    fn test_env_beats_default() {
        assert_eq!(
            pick_namespace(None, None, Some("from-env".to_string())),
            "from-env"
        );
    }

    #[test]
    fn test_falls_back_to_default() {
        assert_eq!(pick_namespace(None, None, None), "default");
        assert_eq!(
            pick_namespace(Some(String::new()), Some(String::new()), None),
            "default"
        );
    }
}
