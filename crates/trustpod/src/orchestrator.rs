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

//! Signing Orchestrator Module
//!
//! Owns the lifecycle of one ephemeral signing workload per operation:
//! - builds the workload from the template and submits it (an
//!   already-exists answer counts as success, so re-invocations are safe)
//! - polls readiness once per second against a hard 60-attempt budget
//! - issues the command sequence for root-key creation or image signing
//! - tears the workload down on every exit path after a successful submit
//!
//! The phases are an explicit state machine ([`Phase`]); failure from any
//! phase is terminal for the invocation and still runs teardown. All
//! external effects go through injected trait objects so the sequencing is
//! testable with doubles: [`WorkloadClient`] (workload create/poll/delete),
//! [`CommandChannel`] (exec transport), [`KeyRecordStore`] (SignerKey
//! persistence) and [`Clock`] (poll pacing).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, info, warn};

use crate::api::signer::ImageSigner;
use crate::api::signer_key::{SignerKey, SignerKeySpec, TrustKey};
use crate::commander::{CommandChannel, Commander, WorkloadRef};
use crate::error::SigningError;
use crate::trust::{self, Role, TrustPass};
use crate::workload::{WorkloadTemplate, CONTAINER_NAME, IMAGE_MOUNT_PATH};

/// Readiness poll budget: one poll per second, sixty attempts.
pub const READINESS_POLL_LIMIT: usize = 60;
/// Pause between readiness polls.
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pod phase value that marks the workload ready for commands.
const PHASE_RUNNING: &str = "Running";

/// Phases of one orchestrator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WorkloadRequested,
    WaitingReady,
    Ready,
    CommandsRunning,
    TornDown,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::WorkloadRequested => "workload-requested",
            Phase::WaitingReady => "waiting-ready",
            Phase::Ready => "ready",
            Phase::CommandsRunning => "commands-running",
            Phase::TornDown => "torn-down",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs for building one signing workload.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Pre-existing root key to seed into the private-key directory.
    pub root_key: Option<TrustKey>,
    /// Pre-existing target key to seed into the private-key directory.
    pub target_key: Option<TrustKey>,
    /// Registry-login dockerconfigjson secret to mount.
    pub dcj_secret_name: Option<String>,
    /// CA-certificate secret to mount.
    pub cert_secret_name: Option<String>,
    /// Claim holding the image tarball.
    pub pvc_name: Option<String>,
}

/// Parameters of one image-signing operation.
#[derive(Debug, Clone)]
pub struct SignParams {
    pub image_name: String,
    pub image_tag: String,
    /// Resolved registry endpoint; empty means "use the bare image name".
    pub registry_endpoint: String,
    /// Whether a fresh target passphrase was assigned for this operation,
    /// in which case the generated target key must be read back and
    /// persisted.
    pub collect_target_key: bool,
}

/// Result of one image-signing operation.
#[derive(Debug, Clone)]
pub struct SignOutcome {
    /// The fully qualified reference the image was signed as.
    pub signed_image: String,
    /// The newly discovered target key, when one was collected.
    pub target_key: Option<TrustKey>,
}

/// Outcome of a workload creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The platform reported the object already exists; treated as success
    /// so the creation step is retry-safe.
    AlreadyExists,
}

/// Create/poll/delete access to ephemeral workload objects.
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    async fn create(&self, pod: &Pod) -> Result<CreateOutcome, SigningError>;
    async fn phase(&self, workload: &WorkloadRef) -> Result<String, SigningError>;
    async fn delete(&self, workload: &WorkloadRef) -> Result<(), SigningError>;
}

/// Persistence for SignerKey records.
#[async_trait]
pub trait KeyRecordStore: Send + Sync {
    /// Creates a new record. Not an upsert: an already-exists conflict
    /// surfaces verbatim, so a retry after a partial failure never
    /// overwrites key material.
    async fn create(&self, key: &SignerKey) -> Result<(), SigningError>;

    /// Adds one target entry, as a merge patch computed against the
    /// pre-fetched `original` snapshot so concurrent unrelated fields are
    /// not clobbered.
    ///
    /// Two concurrent additions under the same signer race last-patch-wins;
    /// one of them can be lost. Known consistency gap, deliberately not
    /// serialized here.
    async fn patch_targets(
        &self,
        original: &SignerKey,
        target_name: &str,
        key: &TrustKey,
    ) -> Result<(), SigningError>;
}

/// Pacing source for the readiness poll, injectable for tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] over the tokio timer.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// [`WorkloadClient`] over the Kubernetes pod API.
pub struct KubeWorkloadClient {
    client: Client,
}

impl KubeWorkloadClient {
    pub fn new(client: Client) -> Self {
        KubeWorkloadClient { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl WorkloadClient for KubeWorkloadClient {
    async fn create(&self, pod: &Pod) -> Result<CreateOutcome, SigningError> {
        let namespace = pod.metadata.namespace.as_deref().unwrap_or_default();
        match self.pods(namespace).create(&PostParams::default(), pod).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(response)) if response.code == 409 => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn phase(&self, workload: &WorkloadRef) -> Result<String, SigningError> {
        let pod = self.pods(&workload.namespace).get(&workload.name).await?;
        Ok(pod
            .status
            .and_then(|status| status.phase)
            .unwrap_or_default())
    }

    async fn delete(&self, workload: &WorkloadRef) -> Result<(), SigningError> {
        self.pods(&workload.namespace)
            .delete(&workload.name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

/// [`KeyRecordStore`] over the cluster-scoped SignerKey API.
pub struct KubeKeyRecordStore {
    client: Client,
}

impl KubeKeyRecordStore {
    pub fn new(client: Client) -> Self {
        KubeKeyRecordStore { client }
    }

    fn records(&self) -> Api<SignerKey> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl KeyRecordStore for KubeKeyRecordStore {
    async fn create(&self, key: &SignerKey) -> Result<(), SigningError> {
        self.records().create(&PostParams::default(), key).await?;
        Ok(())
    }

    async fn patch_targets(
        &self,
        original: &SignerKey,
        target_name: &str,
        key: &TrustKey,
    ) -> Result<(), SigningError> {
        // Diff against the snapshot: the patch carries only the added entry.
        let patch = serde_json::json!({
            "spec": { "targets": { target_name: key } }
        });
        self.records()
            .patch(
                &original.name_any(),
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(())
    }
}

/// Sequences one signing operation against one ephemeral workload.
pub struct SigningOrchestrator {
    workloads: Arc<dyn WorkloadClient>,
    channel: Arc<dyn CommandChannel>,
    keys: Arc<dyn KeyRecordStore>,
    clock: Arc<dyn Clock>,
    workload: WorkloadRef,
    phase: Phase,
}

impl SigningOrchestrator {
    /// Creates an orchestrator for one operation on behalf of `signer_name`.
    ///
    /// The workload name is salted with a random suffix so concurrent
    /// operations never share an instance.
    pub fn new(
        workloads: Arc<dyn WorkloadClient>,
        channel: Arc<dyn CommandChannel>,
        keys: Arc<dyn KeyRecordStore>,
        clock: Arc<dyn Clock>,
        signer_name: &str,
        namespace: &str,
    ) -> Self {
        let name = format!(
            "image-signing-by-{signer_name}-{}",
            trust::random_string(10)
        );
        SigningOrchestrator {
            workloads,
            channel,
            keys,
            clock,
            workload: WorkloadRef {
                name,
                namespace: namespace.to_string(),
            },
            phase: Phase::Idle,
        }
    }

    /// The workload this invocation owns.
    pub fn workload(&self) -> &WorkloadRef {
        &self.workload
    }

    /// The current phase; observability only.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Generates a root key for `signer`, persists it as a new SignerKey
    /// owned by the signer, and returns the key.
    ///
    /// The workload is torn down on every path after a successful submit.
    pub async fn create_root_key(
        &mut self,
        signer: &ImageSigner,
        pass: &TrustPass,
        options: &CommandOptions,
    ) -> Result<TrustKey, SigningError> {
        self.submit(pass, options).await?;
        let result = match self.wait_ready().await {
            Ok(()) => self.root_key_commands(signer, pass).await,
            Err(error) => Err(error),
        };
        self.finish(result).await
    }

    /// Loads, tags and signs one image; optionally collects and persists
    /// the freshly generated target key.
    ///
    /// The workload is torn down on every path after a successful submit.
    pub async fn sign_image(
        &mut self,
        record: &SignerKey,
        target_name: &str,
        pass: &TrustPass,
        options: &CommandOptions,
        params: &SignParams,
    ) -> Result<SignOutcome, SigningError> {
        self.submit(pass, options).await?;
        let result = match self.wait_ready().await {
            Ok(()) => self.sign_commands(record, target_name, pass, params).await,
            Err(error) => Err(error),
        };
        self.finish(result).await
    }

    fn transition(&mut self, next: Phase) {
        debug!(workload = %self.workload.name, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    /// Builds the workload from the template and submits it. AlreadyExists
    /// counts as success.
    async fn submit(
        &mut self,
        pass: &TrustPass,
        options: &CommandOptions,
    ) -> Result<(), SigningError> {
        let mut template = WorkloadTemplate::new(&self.workload.namespace, &self.workload.name)
            .pvc(options.pvc_name.clone())
            .dcj_secret(options.dcj_secret_name.clone())
            .cert_secret(options.cert_secret_name.clone());
        for (key, value) in pass.env_pairs() {
            template = template.env(key, value);
        }
        if let Some(key) = &options.root_key {
            template = template.seed_key(key);
        }
        if let Some(key) = &options.target_key {
            template = template.seed_key(key);
        }
        let pod = template.build();

        self.transition(Phase::WorkloadRequested);
        match self.workloads.create(&pod).await {
            Ok(CreateOutcome::Created) => {
                info!(workload = %self.workload.name, "signing workload created");
                Ok(())
            }
            Ok(CreateOutcome::AlreadyExists) => {
                info!(workload = %self.workload.name, "signing workload already exists, reusing");
                Ok(())
            }
            Err(error) => {
                self.transition(Phase::Failed);
                Err(error)
            }
        }
    }

    /// Polls the workload phase up to the budget. Transport errors abort
    /// immediately.
    async fn wait_ready(&mut self) -> Result<(), SigningError> {
        self.transition(Phase::WaitingReady);
        for _ in 0..READINESS_POLL_LIMIT {
            let phase = self.workloads.phase(&self.workload).await?;
            if phase == PHASE_RUNNING {
                self.transition(Phase::Ready);
                return Ok(());
            }
            self.clock.sleep(READINESS_POLL_INTERVAL).await;
        }
        Err(SigningError::WorkloadNotReady)
    }

    async fn root_key_commands(
        &mut self,
        signer: &ImageSigner,
        pass: &TrustPass,
    ) -> Result<TrustKey, SigningError> {
        self.transition(Phase::CommandsRunning);
        let commander = self.commander();

        info!("generate key");
        let out = commander.generate_key(Role::Root).await?;
        debug!(stdout = %out.stdout, stderr = %out.stderr, "generate key output");

        let root_key = self.read_trust_key(&commander, pass, Role::Root).await?;

        info!(key_id = %root_key.id, "create signer key record");
        self.keys.create(&signer_key_record(signer, &root_key)).await?;

        Ok(root_key)
    }

    async fn sign_commands(
        &mut self,
        record: &SignerKey,
        target_name: &str,
        pass: &TrustPass,
        params: &SignParams,
    ) -> Result<SignOutcome, SigningError> {
        self.transition(Phase::CommandsRunning);
        let commander = self.commander();

        let tar_path = format!("{IMAGE_MOUNT_PATH}/{}.tar", params.image_name);
        let out = commander.load_image_tar(&tar_path).await?;
        debug!(stdout = %out.stdout, stderr = %out.stderr, "load image output");

        let out = commander.list_image_ids().await?;
        let image_id = out
            .stdout
            .split_whitespace()
            .next()
            .ok_or(SigningError::ImageNotFound)?
            .to_string();

        let signed_image = qualified_image(
            &params.registry_endpoint,
            &params.image_name,
            &params.image_tag,
        );
        commander.tag_image(&image_id, &signed_image).await?;

        info!(image = %signed_image, "sign image");
        let out = commander.sign(&signed_image).await?;
        debug!(stdout = %out.stdout, stderr = %out.stderr, "sign output");

        let target_key = if params.collect_target_key {
            let key = self.read_trust_key(&commander, pass, Role::Target).await?;
            info!(key_id = %key.id, %target_name, "persist target key");
            self.keys.patch_targets(record, target_name, &key).await?;
            Some(key)
        } else {
            None
        };

        Ok(SignOutcome {
            signed_image,
            target_key,
        })
    }

    /// Scans the private-key directory for the first key whose description
    /// carries the wanted role. The scan is sequential and stops at the
    /// first match; exhausting the list is fatal.
    async fn read_trust_key(
        &self,
        commander: &Commander,
        pass: &TrustPass,
        role: Role,
    ) -> Result<TrustKey, SigningError> {
        let out = commander.list_keys().await?;
        debug!(stdout = %out.stdout, stderr = %out.stderr, "list keys output");

        for name in out.stdout.split_whitespace() {
            debug!(key = %name, "inspect private key");
            let read = commander.read_key(name).await?;
            if trust::key_role(&read.stdout) == Some(role.as_str()) {
                return Ok(TrustKey {
                    id: name.to_string(),
                    key: read.stdout,
                    pass_phrase: pass.pass(role).to_string(),
                });
            }
        }
        Err(SigningError::KeyFileNotFound)
    }

    /// Tears the workload down and folds the result with the command
    /// phase's. A teardown failure after a successful command phase is the
    /// call's error; after a failed command phase the command error wins
    /// and the teardown failure is only logged.
    async fn finish<T>(&mut self, result: Result<T, SigningError>) -> Result<T, SigningError> {
        if result.is_err() && self.phase != Phase::Failed {
            self.transition(Phase::Failed);
        }
        let teardown = self.teardown().await;
        match (result, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(error)) => Err(error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(teardown_error)) => {
                warn!(%teardown_error, "teardown failed on an already failing operation");
                Err(error)
            }
        }
    }

    async fn teardown(&mut self) -> Result<(), SigningError> {
        match self.workloads.delete(&self.workload).await {
            Ok(()) => {
                info!(
                    workload = %self.workload.name,
                    namespace = %self.workload.namespace,
                    "signing workload deleted"
                );
                if self.phase != Phase::Failed {
                    self.transition(Phase::TornDown);
                }
                Ok(())
            }
            Err(error) => Err(SigningError::Teardown(error.to_string())),
        }
    }

    fn commander(&self) -> Commander {
        Commander::new(
            self.channel.clone(),
            self.workload.clone(),
            CONTAINER_NAME.to_string(),
        )
    }
}

/// The fully qualified reference an image is tagged and signed as. An empty
/// endpoint leaves the image name bare.
fn qualified_image(endpoint: &str, name: &str, tag: &str) -> String {
    if endpoint.is_empty() {
        format!("{name}:{tag}")
    } else {
        format!("{endpoint}/{name}:{tag}")
    }
}

/// Builds the SignerKey record for a freshly created root key, owned by its
/// signer so the record's lifecycle follows the identity's.
fn signer_key_record(signer: &ImageSigner, root_key: &TrustKey) -> SignerKey {
    let mut record = SignerKey::new(
        &signer.name_any(),
        SignerKeySpec {
            root: root_key.clone(),
            targets: Default::default(),
        },
    );
    record.metadata.owner_references = signer
        .controller_owner_ref(&())
        .map(|reference| vec![reference]);
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_image_with_endpoint() {
        assert_eq!(
            qualified_image("registry.example.com", "app", "1.0"),
            "registry.example.com/app:1.0"
        );
    }

    #[test]
    fn test_qualified_image_without_endpoint() {
        assert_eq!(qualified_image("", "app", "1.0"), "app:1.0");
    }

    #[test]
    fn test_signer_key_record_is_owned_by_signer() {
        let mut signer = ImageSigner::new("dev-signer", Default::default());
        signer.metadata.uid = Some("uid-1".to_string());
        let root_key = TrustKey {
            id: "abc".to_string(),
            key: "material".to_string(),
            pass_phrase: "secret".to_string(),
        };

        let record = signer_key_record(&signer, &root_key);

        assert_eq!(record.name_any(), "dev-signer");
        assert_eq!(record.spec.root, root_key);
        assert!(record.spec.targets.is_empty());
        let owners = record.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "ImageSigner");
        assert_eq!(owners[0].name, "dev-signer");
    }
}
