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

//! Custom resource types for the `trustpod.io/v1` API group.
//!
//! - [`ImageSigner`](signer::ImageSigner) - cluster-scoped signing identity
//! - [`SignerKey`](signer_key::SignerKey) - durable key material for one
//!   identity: a root key plus per-target keys
//! - [`ImageSignRequest`](sign_request::ImageSignRequest) - one-shot intent
//!   to sign a concrete image under an identity
//! - [`Registry`](registry::Registry) - external registry object; only its
//!   login-URL annotation is consumed here

pub mod registry;
pub mod sign_request;
pub mod signer;
pub mod signer_key;

/// API group of all trustpod custom resources.
pub const API_GROUP: &str = "trustpod.io";
/// API version of all trustpod custom resources.
pub const API_VERSION: &str = "v1";

pub use registry::{Registry, RegistrySpec, LOGIN_URL_ANNOTATION};
pub use sign_request::{
    ImageSignRequest, ImageSignRequestSpec, ImageSignRequestStatus, RegistryLogin, ResponseResult,
    SignResponse,
};
pub use signer::{ImageSigner, ImageSignerSpec, ImageSignerStatus};
pub use signer_key::{SignerKey, SignerKeySpec, TrustKey};
