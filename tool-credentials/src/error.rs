//! Credential verification errors.

use serde_json::{Value, json};
use thiserror::Error;
use tool_primitives::ErrorKind;

use crate::provider::ProviderKind;

/// Result alias used by credential providers.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Failure at one of the verification stages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential source could be found.
    #[error("{provider} credential source not found: {detail}")]
    MissingSource {
        /// Provider being verified.
        provider: ProviderKind,
        /// What was looked for and where.
        detail: String,
    },

    /// The credential was found but is not usable as-is.
    #[error("{provider} credential is malformed: {reason}")]
    Malformed {
        /// Provider being verified.
        provider: ProviderKind,
        /// Human-readable reason.
        reason: String,
        /// Required fields that were absent or empty.
        missing_fields: Vec<String>,
    },

    /// The provider refused the credential.
    #[error("{provider} rejected the credential: {reason}")]
    Rejected {
        /// Provider being verified.
        provider: ProviderKind,
        /// Reason reported by the provider.
        reason: String,
        /// HTTP status of the rejection.
        status: u16,
    },

    /// The provider could not be reached or answered unexpectedly.
    #[error("{provider} verification request failed: {reason}")]
    Transport {
        /// Provider being verified.
        provider: ProviderKind,
        /// Additional context about the failure.
        reason: String,
    },

    /// The provider client itself is misconfigured.
    #[error("credential provider not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },
}

impl CredentialError {
    /// Convenience constructor for missing sources.
    #[must_use]
    pub fn missing(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::MissingSource {
            provider,
            detail: detail.into(),
        }
    }

    /// Convenience constructor for malformed credentials.
    #[must_use]
    pub fn malformed(
        provider: ProviderKind,
        reason: impl Into<String>,
        missing_fields: Vec<String>,
    ) -> Self {
        Self::Malformed {
            provider,
            reason: reason.into(),
            missing_fields,
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Envelope classification for this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingSource { .. } => ErrorKind::MissingCredentialSource,
            Self::Malformed { .. } => ErrorKind::MalformedCredential,
            Self::Rejected { .. } => ErrorKind::ProviderRejected,
            Self::Transport { .. } | Self::Configuration { .. } => ErrorKind::HandlerFailure,
        }
    }

    /// Structured context reported alongside the message.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::MissingSource { provider, .. } | Self::Transport { provider, .. } => {
                Some(json!({ "provider": provider }))
            }
            Self::Malformed {
                provider,
                missing_fields,
                ..
            } => Some(json!({ "provider": provider, "missing_fields": missing_fields })),
            Self::Rejected {
                provider, status, ..
            } => Some(json!({ "provider": provider, "status": status })),
            Self::Configuration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_taxonomy() {
        let aws = ProviderKind::Aws;
        assert_eq!(
            CredentialError::missing(aws, "x").kind(),
            ErrorKind::MissingCredentialSource
        );
        assert_eq!(
            CredentialError::malformed(aws, "x", vec![]).kind(),
            ErrorKind::MalformedCredential
        );
        assert_eq!(
            CredentialError::transport(aws, "x").kind(),
            ErrorKind::HandlerFailure
        );
    }

    #[test]
    fn malformed_details_list_missing_fields() {
        let err = CredentialError::malformed(
            ProviderKind::Gcp,
            "missing required fields",
            vec!["client_email".into(), "private_key".into()],
        );
        assert_eq!(
            err.details(),
            Some(json!({
                "provider": "gcp",
                "missing_fields": ["client_email", "private_key"],
            }))
        );
    }
}
