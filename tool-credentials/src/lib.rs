//! Cloud credential verification.
//!
//! Every provider goes through the same three stages, driven by
//! [`run_verification`]:
//!
//! 1. **presence**: find the credential source in the [`Environment`]
//!    (fails with [`CredentialError::MissingSource`], no network traffic);
//! 2. **shape**: parse it and check required fields
//!    (fails with [`CredentialError::Malformed`]);
//! 3. **live**: one round-trip to the provider
//!    (fails with [`CredentialError::Rejected`] or
//!    [`CredentialError::Transport`]).
//!
//! [`Environment`]: tool_primitives::Environment

#![warn(missing_docs, clippy::pedantic)]

pub mod aws;
mod error;
pub mod gcp;
mod http_client;
mod provider;

pub use aws::{AwsConfig, AwsCredential, AwsProvider};
pub use error::{CredentialError, CredentialResult};
pub use gcp::{GcpConfig, GcpProvider, ServiceAccountKey};
pub use provider::{
    CredentialCheck, CredentialProvider, ProviderKind, VerifiedIdentity, run_verification,
};
