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

//! Command channel: executes single shell commands inside the running
//! signing workload and captures stdout/stderr.
//!
//! [`CommandChannel`] is the transport primitive (no retries, no TTY, no
//! stdin; any failure surfaces immediately). [`Commander`] layers the fixed
//! command templates used to drive the signing tool on top of it. The
//! templates are pure string builders and carry no error semantics of their
//! own.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use kube::Client;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::SigningError;
use crate::trust::Role;

/// Docker content trust base directory inside the signing workload.
pub const TRUST_BASE_DIR: &str = "/root/.docker/trust";
/// Private-key directory inside the signing workload.
pub const PRIVATE_KEY_DIR: &str = "/root/.docker/trust/private";

/// Captured output of one executed command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Identifies one ephemeral signing workload instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
}

/// Exec-in-container transport.
///
/// The command is a single shell-invoked string; the caller is responsible
/// for quoting. Implementations must not retry: a transport or
/// container-not-found failure is the operation's failure.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn execute(
        &self,
        workload: &WorkloadRef,
        container: &str,
        command: &str,
    ) -> Result<ExecOutput, SigningError>;
}

/// [`CommandChannel`] over the Kubernetes pod exec subresource.
pub struct KubeExecChannel {
    client: Client,
}

impl KubeExecChannel {
    pub fn new(client: Client) -> Self {
        KubeExecChannel { client }
    }
}

#[async_trait]
impl CommandChannel for KubeExecChannel {
    async fn execute(
        &self,
        workload: &WorkloadRef,
        container: &str,
        command: &str,
    ) -> Result<ExecOutput, SigningError> {
        debug!(workload = %workload.name, %container, %command, "exec");
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &workload.namespace);
        let params = AttachParams::default()
            .container(container)
            .stdout(true)
            .stderr(true);

        let mut attached = pods
            .exec(&workload.name, vec!["/bin/sh", "-c", command], &params)
            .await
            .map_err(|e| SigningError::Command(e.to_string()))?;

        let mut stdout_reader = attached
            .stdout()
            .ok_or_else(|| SigningError::Command("exec stdout stream unavailable".to_string()))?;
        let mut stderr_reader = attached
            .stderr()
            .ok_or_else(|| SigningError::Command("exec stderr stream unavailable".to_string()))?;
        let status = attached.take_status();

        let mut stdout = String::new();
        let mut stderr = String::new();
        tokio::try_join!(
            stdout_reader.read_to_string(&mut stdout),
            stderr_reader.read_to_string(&mut stderr)
        )
        .map_err(|e| SigningError::Command(e.to_string()))?;

        if let Some(status) = status {
            if let Some(status) = status.await {
                if status.status.as_deref() == Some("Failure") {
                    return Err(SigningError::Command(
                        status
                            .message
                            .unwrap_or_else(|| "command exited with failure status".to_string()),
                    ));
                }
            }
        }
        attached
            .join()
            .await
            .map_err(|e| SigningError::Command(e.to_string()))?;

        Ok(ExecOutput { stdout, stderr })
    }
}

/// Drives the signing tool inside one workload through fixed command
/// templates.
pub struct Commander {
    channel: Arc<dyn CommandChannel>,
    workload: WorkloadRef,
    container: String,
}

impl Commander {
    pub fn new(channel: Arc<dyn CommandChannel>, workload: WorkloadRef, container: String) -> Self {
        Commander {
            channel,
            workload,
            container,
        }
    }

    /// Generates a new key for the given trust role.
    pub async fn generate_key(&self, role: Role) -> Result<ExecOutput, SigningError> {
        self.run(&commands::ensure_trust_dir()).await?;
        self.run(&commands::generate_key(role)).await
    }

    /// Lists the key files in the private-key directory.
    pub async fn list_keys(&self) -> Result<ExecOutput, SigningError> {
        self.run(&commands::list_keys()).await
    }

    /// Reads one key file from the private-key directory.
    pub async fn read_key(&self, name: &str) -> Result<ExecOutput, SigningError> {
        self.run(&commands::read_key(name)).await
    }

    /// Loads an image tarball into the workload's image store.
    pub async fn load_image_tar(&self, path: &str) -> Result<ExecOutput, SigningError> {
        self.run(&commands::load_image_tar(path)).await
    }

    /// Tags `source` as `destination`.
    pub async fn tag_image(&self, source: &str, destination: &str) -> Result<ExecOutput, SigningError> {
        self.run(&commands::tag_image(source, destination)).await
    }

    /// Signs (and pushes) the fully qualified image reference.
    pub async fn sign(&self, image: &str) -> Result<ExecOutput, SigningError> {
        self.run(&commands::sign(image)).await
    }

    /// Lists the identifiers of loaded images.
    pub async fn list_image_ids(&self) -> Result<ExecOutput, SigningError> {
        self.run(&commands::list_image_ids()).await
    }

    async fn run(&self, command: &str) -> Result<ExecOutput, SigningError> {
        self.channel
            .execute(&self.workload, &self.container, command)
            .await
    }
}

/// The fixed shell command templates. Kept as plain string builders so the
/// exact wire commands are unit-testable.
mod commands {
    use super::{PRIVATE_KEY_DIR, TRUST_BASE_DIR};
    use crate::trust::Role;

    pub fn ensure_trust_dir() -> String {
        format!("mkdir -p {TRUST_BASE_DIR}")
    }

    pub fn generate_key(role: Role) -> String {
        format!("docker trust key generate {role} --dir {TRUST_BASE_DIR}")
    }

    pub fn list_keys() -> String {
        format!("ls --color=never {PRIVATE_KEY_DIR}")
    }

    pub fn read_key(name: &str) -> String {
        format!("cat {PRIVATE_KEY_DIR}/{name}")
    }

    pub fn load_image_tar(path: &str) -> String {
        format!("docker load < {path}")
    }

    pub fn tag_image(source: &str, destination: &str) -> String {
        format!("docker tag {source} {destination}")
    }

    pub fn sign(image: &str) -> String {
        format!("docker trust sign {image}")
    }

    pub fn list_image_ids() -> String {
        "docker images -q".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::commands;
    use crate::trust::Role;

    #[test]
    fn test_generate_key_command() {
        assert_eq!(
            commands::generate_key(Role::Root),
            "docker trust key generate root --dir /root/.docker/trust"
        );
        assert_eq!(
            commands::generate_key(Role::Target),
            "docker trust key generate target --dir /root/.docker/trust"
        );
    }

    #[test]
    fn test_key_directory_commands() {
        assert_eq!(
            commands::ensure_trust_dir(),
            "mkdir -p /root/.docker/trust"
        );
        assert_eq!(
            commands::list_keys(),
            "ls --color=never /root/.docker/trust/private"
        );
        assert_eq!(
            commands::read_key("abc123"),
            "cat /root/.docker/trust/private/abc123"
        );
    }

    #[test]
    fn test_image_commands() {
        assert_eq!(
            commands::load_image_tar("/tmp/app.tar"),
            "docker load < /tmp/app.tar"
        );
        assert_eq!(
            commands::tag_image("sha1", "registry.example.com/app:1.0"),
            "docker tag sha1 registry.example.com/app:1.0"
        );
        assert_eq!(
            commands::sign("registry.example.com/app:1.0"),
            "docker trust sign registry.example.com/app:1.0"
        );
        assert_eq!(commands::list_image_ids(), "docker images -q");
    }
}
