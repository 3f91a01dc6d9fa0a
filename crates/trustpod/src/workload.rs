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

//! Template builder for the ephemeral signing workload: a single privileged
//! docker-in-docker container, with optional passphrase env vars, tarball /
//! credential / CA-cert mounts, and a post-start script that prepares the
//! trust directories and seeds pre-existing key material.
//!
//! The platform supports exactly one post-start hook, so the whole
//! post-start sequence is assembled as one semicolon-joined shell script,
//! after every other option is known.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EnvVar, ExecAction, Lifecycle, LifecycleHandler, PersistentVolumeClaimVolumeSource,
    Pod, PodSpec, SecretVolumeSource, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::api::signer_key::TrustKey;
use crate::commander::PRIVATE_KEY_DIR;

/// Default image for the signing workload's container.
pub const DEFAULT_DIND_IMAGE: &str = "docker:19.03.0-beta5-dind";
/// Name of the signing container inside the workload.
pub const CONTAINER_NAME: &str = "docker-cli";
/// Where the image-tarball claim is mounted.
pub const IMAGE_MOUNT_PATH: &str = "/tmp";

const IMAGE_PVC_VOLUME: &str = "image-pvc";
const DCJ_VOLUME: &str = "dockerconfigjson";
const DCJ_MOUNT_PATH: &str = "/home/dockremap";
const CERT_VOLUME: &str = "cert";
const CERT_MOUNT_PATH: &str = "/usr/local/share/ca-certificates";

/// Builds the pod specification of one ephemeral signing workload.
///
/// Options touching disjoint pod fields commute; only the post-start script
/// depends on other options (credential mount and seed keys), and it is
/// assembled once, at [`build`](WorkloadTemplate::build).
#[derive(Debug, Clone)]
pub struct WorkloadTemplate {
    namespace: String,
    name: String,
    image: Option<String>,
    env: Vec<(String, String)>,
    pvc_name: Option<String>,
    dcj_secret: Option<String>,
    cert_secret: Option<String>,
    seed_keys: Vec<TrustKey>,
}

impl WorkloadTemplate {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        WorkloadTemplate {
            namespace: namespace.into(),
            name: name.into(),
            image: None,
            env: Vec::new(),
            pvc_name: None,
            dcj_secret: None,
            cert_secret: None,
            seed_keys: Vec::new(),
        }
    }

    /// Overrides the default docker-in-docker image.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        let image = image.into();
        if !image.is_empty() {
            self.image = Some(image);
        }
        self
    }

    /// Injects one environment variable into the signing container.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Mounts the image-tarball claim at the fixed mount path. No-op when
    /// absent.
    pub fn pvc(mut self, claim_name: Option<String>) -> Self {
        self.pvc_name = claim_name.filter(|name| !name.is_empty());
        self
    }

    /// Mounts the registry-login dockerconfigjson secret and arranges for
    /// it to be copied where the signing tool expects it. No-op when absent.
    pub fn dcj_secret(mut self, secret_name: Option<String>) -> Self {
        self.dcj_secret = secret_name.filter(|name| !name.is_empty());
        self
    }

    /// Mounts the CA-certificate secret into the trusted CA directory.
    /// No-op when absent.
    pub fn cert_secret(mut self, secret_name: Option<String>) -> Self {
        self.cert_secret = secret_name.filter(|name| !name.is_empty());
        self
    }

    /// Seeds one pre-existing key into the private-key directory before the
    /// signing tool runs. Supply order is preserved in the post-start
    /// script. Keys without material are skipped.
    pub fn seed_key(mut self, key: &TrustKey) -> Self {
        if key.is_seedable() {
            self.seed_keys.push(key.clone());
        }
        self
    }

    /// Assembles the pod.
    pub fn build(self) -> Pod {
        let mut volumes = Vec::new();
        let mut mounts = Vec::new();

        if let Some(claim_name) = &self.pvc_name {
            volumes.push(Volume {
                name: IMAGE_PVC_VOLUME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: claim_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            });
            mounts.push(VolumeMount {
                name: IMAGE_PVC_VOLUME.to_string(),
                mount_path: IMAGE_MOUNT_PATH.to_string(),
                ..Default::default()
            });
        }
        if let Some(secret_name) = &self.dcj_secret {
            volumes.push(secret_volume(DCJ_VOLUME, secret_name));
            mounts.push(mount(DCJ_VOLUME, DCJ_MOUNT_PATH));
        }
        if let Some(secret_name) = &self.cert_secret {
            volumes.push(secret_volume(CERT_VOLUME, secret_name));
            mounts.push(mount(CERT_VOLUME, CERT_MOUNT_PATH));
        }

        let env = (!self.env.is_empty()).then(|| {
            self.env
                .iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: Some(value.clone()),
                    ..Default::default()
                })
                .collect()
        });

        let container = Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(
                self.image
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DIND_IMAGE.to_string()),
            ),
            security_context: Some(SecurityContext {
                privileged: Some(true),
                ..Default::default()
            }),
            env,
            volume_mounts: (!mounts.is_empty()).then_some(mounts),
            lifecycle: Some(Lifecycle {
                post_start: Some(LifecycleHandler {
                    exec: Some(ExecAction {
                        command: Some(vec![
                            "/bin/sh".to_string(),
                            "-c".to_string(),
                            self.post_start_script(),
                        ]),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        Pod {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                labels: Some(BTreeMap::from([(
                    "obj".to_string(),
                    CONTAINER_NAME.to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![container],
                volumes: (!volumes.is_empty()).then_some(volumes),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// The single post-start script: refresh the CA bundle, create the
    /// private-key directory, copy the login credential if one was mounted,
    /// then write each seed key to its identifier-named file.
    fn post_start_script(&self) -> String {
        let mut script = vec![
            "update-ca-certificates".to_string(),
            format!("mkdir -p {PRIVATE_KEY_DIR}"),
        ];
        if self.dcj_secret.is_some() {
            script.push(format!(
                "cp {DCJ_MOUNT_PATH}/.dockerconfigjson /root/.docker/config.json"
            ));
        }
        for key in &self.seed_keys {
            script.push(store_file_command(&key.id, &key.key));
        }
        script.join("; ")
    }
}

fn store_file_command(filename: &str, contents: &str) -> String {
    format!("echo \"{contents}\" > {PRIVATE_KEY_DIR}/{filename}")
}

fn secret_volume(volume_name: &str, secret_name: &str) -> Volume {
    Volume {
        name: volume_name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mount(volume_name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: volume_name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trust_key(id: &str, key: &str) -> TrustKey {
        TrustKey {
            id: id.to_string(),
            key: key.to_string(),
            pass_phrase: "secret".to_string(),
        }
    }

    fn post_start_of(pod: &Pod) -> String {
        pod.spec.as_ref().unwrap().containers[0]
            .lifecycle
            .as_ref()
            .unwrap()
            .post_start
            .as_ref()
            .unwrap()
            .exec
            .as_ref()
            .unwrap()
            .command
            .as_ref()
            .unwrap()[2]
            .clone()
    }

    #[test]
    fn test_base_template_is_privileged_single_container() {
        let pod = WorkloadTemplate::new("signing", "image-signing-by-dev-abc").build();

        assert_eq!(pod.metadata.name.as_deref(), Some("image-signing-by-dev-abc"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("signing"));
        assert_eq!(
            pod.metadata.labels.as_ref().unwrap().get("obj"),
            Some(&"docker-cli".to_string())
        );

        let spec = pod.spec.as_ref().unwrap();
        assert_eq!(spec.containers.len(), 1);
        let container = &spec.containers[0];
        assert_eq!(container.name, CONTAINER_NAME);
        assert_eq!(container.image.as_deref(), Some(DEFAULT_DIND_IMAGE));
        assert_eq!(
            container.security_context.as_ref().unwrap().privileged,
            Some(true)
        );
    }

    #[test]
    fn test_empty_image_override_keeps_default() {
        let pod = WorkloadTemplate::new("signing", "w").image("").build();
        let container = &pod.spec.as_ref().unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some(DEFAULT_DIND_IMAGE));
    }

    #[test]
    fn test_base_post_start_script() {
        let pod = WorkloadTemplate::new("signing", "w").build();
        assert_eq!(
            post_start_of(&pod),
            "update-ca-certificates; mkdir -p /root/.docker/trust/private"
        );
    }

    #[test]
    fn test_seed_keys_append_write_commands_in_supply_order() {
        let pod = WorkloadTemplate::new("signing", "w")
            .seed_key(&trust_key("rootid", "root material"))
            .seed_key(&trust_key("targetid", "target material"))
            .build();

        let script = post_start_of(&pod);
        let writes: Vec<&str> = script
            .split("; ")
            .filter(|cmd| cmd.starts_with("echo "))
            .collect();
        assert_eq!(
            writes,
            vec![
                "echo \"root material\" > /root/.docker/trust/private/rootid",
                "echo \"target material\" > /root/.docker/trust/private/targetid",
            ]
        );
    }

    #[test]
    fn test_unseedable_key_is_skipped() {
        let pod = WorkloadTemplate::new("signing", "w")
            .seed_key(&TrustKey {
                id: String::new(),
                key: "material".to_string(),
                pass_phrase: "p".to_string(),
            })
            .build();
        assert!(!post_start_of(&pod).contains("echo"));
    }

    #[test]
    fn test_dcj_secret_mount_and_credential_copy() {
        let pod = WorkloadTemplate::new("signing", "w")
            .dcj_secret(Some("login-secret".to_string()))
            .seed_key(&trust_key("rootid", "material"))
            .build();

        let spec = pod.spec.as_ref().unwrap();
        let volume = &spec.volumes.as_ref().unwrap()[0];
        assert_eq!(volume.name, "dockerconfigjson");
        assert_eq!(
            volume.secret.as_ref().unwrap().secret_name.as_deref(),
            Some("login-secret")
        );
        let mount = &spec.containers[0].volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.mount_path, "/home/dockremap");

        // credential copy is scripted before the seed-key writes
        let script = post_start_of(&pod);
        let cp = script
            .find("cp /home/dockremap/.dockerconfigjson /root/.docker/config.json")
            .unwrap();
        let seed = script.find("echo ").unwrap();
        assert!(cp < seed);
    }

    #[test]
    fn test_cert_secret_mounts_into_ca_directory() {
        let pod = WorkloadTemplate::new("signing", "w")
            .cert_secret(Some("registry-ca".to_string()))
            .build();

        let spec = pod.spec.as_ref().unwrap();
        assert_eq!(spec.volumes.as_ref().unwrap()[0].name, "cert");
        let mount = &spec.containers[0].volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.mount_path, "/usr/local/share/ca-certificates");
        // no credential copy without a dcj secret
        assert!(!post_start_of(&pod).contains("config.json"));
    }

    #[test]
    fn test_pvc_mounts_at_image_path() {
        let pod = WorkloadTemplate::new("signing", "w")
            .pvc(Some("image-claim".to_string()))
            .build();

        let spec = pod.spec.as_ref().unwrap();
        let volume = &spec.volumes.as_ref().unwrap()[0];
        assert_eq!(volume.name, "image-pvc");
        assert_eq!(
            volume
                .persistent_volume_claim
                .as_ref()
                .unwrap()
                .claim_name,
            "image-claim"
        );
        let mount = &spec.containers[0].volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.mount_path, IMAGE_MOUNT_PATH);
    }

    #[test]
    fn test_absent_options_are_no_ops() {
        let pod = WorkloadTemplate::new("signing", "w")
            .pvc(None)
            .dcj_secret(Some(String::new()))
            .cert_secret(None)
            .build();

        let spec = pod.spec.as_ref().unwrap();
        assert!(spec.volumes.is_none());
        assert!(spec.containers[0].volume_mounts.is_none());
    }

    #[test]
    fn test_disjoint_options_commute() {
        let a = WorkloadTemplate::new("signing", "w")
            .env("K", "v")
            .pvc(Some("claim".to_string()))
            .build();
        let b = WorkloadTemplate::new("signing", "w")
            .pvc(Some("claim".to_string()))
            .env("K", "v")
            .build();
        assert_eq!(a, b);
    }
}
