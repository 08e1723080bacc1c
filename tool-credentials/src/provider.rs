//! Provider abstraction and the shared verification flow.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tool_primitives::Environment;
use tracing::{debug, info, warn};

use crate::error::{CredentialError, CredentialResult};

/// Cloud identity services that can verify a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon Web Services (STS).
    Aws,
    /// Google Cloud Platform (OAuth token endpoint).
    Gcp,
}

impl ProviderKind {
    /// Lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "gcp" | "google" => Ok(Self::Gcp),
            other => Err(CredentialError::configuration(format!(
                "unknown credential provider `{other}`"
            ))),
        }
    }
}

/// Provider-specific facts returned after a successful live check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    provider: ProviderKind,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

impl VerifiedIdentity {
    /// Creates an identity with no metadata.
    #[must_use]
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            metadata: Map::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Provider that accepted the credential.
    #[must_use]
    pub const fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Metadata reported by the provider.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Looks up a single metadata entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// A cloud provider able to verify one kind of credential.
///
/// Implementors supply the three stages; [`run_verification`] sequences them.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Raw material found during the presence stage.
    type Source: Send;
    /// Parsed credential ready for the live check.
    type Credential: Send + Sync;

    /// Provider identifier.
    fn kind(&self) -> ProviderKind;

    /// Presence stage.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingSource`] when nothing is configured.
    fn locate(&self, env: &dyn Environment) -> CredentialResult<Self::Source>;

    /// Shape stage.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Malformed`] for unparseable payloads or
    /// missing required fields.
    fn parse(&self, source: Self::Source) -> CredentialResult<Self::Credential>;

    /// Live stage: exactly one round-trip to the provider.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Rejected`] when the provider refuses the
    /// credential or [`CredentialError::Transport`] when it cannot be reached.
    async fn verify(&self, credential: &Self::Credential) -> CredentialResult<VerifiedIdentity>;
}

/// Runs presence, shape, and live verification in order, stopping at the
/// first failure.
///
/// # Errors
///
/// Propagates the error of whichever stage failed.
pub async fn run_verification<P>(
    provider: &P,
    env: &dyn Environment,
) -> CredentialResult<VerifiedIdentity>
where
    P: CredentialProvider + ?Sized,
{
    let kind = provider.kind();

    let source = provider.locate(env).inspect_err(|err| {
        debug!(provider = %kind, error = %err, "credential source absent");
    })?;

    let credential = provider.parse(source).inspect_err(|err| {
        debug!(provider = %kind, error = %err, "credential failed shape check");
    })?;

    match provider.verify(&credential).await {
        Ok(identity) => {
            info!(provider = %kind, "credential verified");
            Ok(identity)
        }
        Err(err) => {
            warn!(provider = %kind, error = %err, "credential verification failed");
            Err(err)
        }
    }
}

/// Object-safe view over any [`CredentialProvider`].
#[async_trait]
pub trait CredentialCheck: Send + Sync {
    /// Provider identifier.
    fn provider_kind(&self) -> ProviderKind;

    /// Runs the full verification flow.
    async fn check(&self, env: &dyn Environment) -> CredentialResult<VerifiedIdentity>;
}

#[async_trait]
impl<P> CredentialCheck for P
where
    P: CredentialProvider,
{
    fn provider_kind(&self) -> ProviderKind {
        self.kind()
    }

    async fn check(&self, env: &dyn Environment) -> CredentialResult<VerifiedIdentity> {
        run_verification(self, env).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tool_primitives::MapEnvironment;

    /// Provider that needs `TOKEN` and `ACCOUNT`; counts live calls.
    #[derive(Default)]
    struct FakeProvider {
        live_calls: AtomicUsize,
        reject: bool,
    }

    #[async_trait]
    impl CredentialProvider for FakeProvider {
        type Source = (Option<String>, Option<String>);
        type Credential = (String, String);

        fn kind(&self) -> ProviderKind {
            ProviderKind::Aws
        }

        fn locate(&self, env: &dyn Environment) -> CredentialResult<Self::Source> {
            let token = env.get("TOKEN");
            let account = env.get("ACCOUNT");
            if token.is_none() && account.is_none() {
                return Err(CredentialError::missing(self.kind(), "TOKEN is not set"));
            }
            Ok((token, account))
        }

        fn parse(&self, source: Self::Source) -> CredentialResult<Self::Credential> {
            match source {
                (Some(token), Some(account)) => Ok((token, account)),
                (token, account) => {
                    let mut missing = Vec::new();
                    if token.is_none() {
                        missing.push("TOKEN".to_owned());
                    }
                    if account.is_none() {
                        missing.push("ACCOUNT".to_owned());
                    }
                    Err(CredentialError::malformed(self.kind(), "incomplete", missing))
                }
            }
        }

        async fn verify(&self, credential: &Self::Credential) -> CredentialResult<VerifiedIdentity> {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(CredentialError::Rejected {
                    provider: self.kind(),
                    reason: "token revoked".into(),
                    status: 403,
                });
            }
            Ok(VerifiedIdentity::new(self.kind()).with("account", credential.1.clone()))
        }
    }

    #[tokio::test]
    async fn absent_source_never_reaches_provider() {
        let provider = FakeProvider::default();
        let err = run_verification(&provider, &MapEnvironment::new())
            .await
            .expect_err("missing source");
        assert!(matches!(err, CredentialError::MissingSource { .. }));
        assert_eq!(provider.live_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn partial_source_lists_missing_fields() {
        let provider = FakeProvider::default();
        let env = MapEnvironment::new().with("TOKEN", "t");
        let err = run_verification(&provider, &env)
            .await
            .expect_err("malformed");
        assert_eq!(
            err,
            CredentialError::malformed(ProviderKind::Aws, "incomplete", vec!["ACCOUNT".into()])
        );
        assert_eq!(provider.live_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn complete_source_is_checked_once() {
        let provider = FakeProvider::default();
        let env = MapEnvironment::new()
            .with("TOKEN", "t")
            .with("ACCOUNT", "123");
        let identity = provider.check(&env).await.unwrap();
        assert_eq!(identity.get("account"), Some(&Value::from("123")));
        assert_eq!(provider.live_calls.load(Ordering::SeqCst), 1);

        let rejecting = FakeProvider {
            reject: true,
            ..FakeProvider::default()
        };
        let err = rejecting.check(&env).await.expect_err("rejected");
        assert!(matches!(err, CredentialError::Rejected { status: 403, .. }));
        assert_eq!(rejecting.live_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identity_serialises_flat() {
        let identity = VerifiedIdentity::new(ProviderKind::Gcp).with("project_id", "demo");
        assert_eq!(
            serde_json::to_value(identity).unwrap(),
            serde_json::json!({"provider": "gcp", "project_id": "demo"})
        );
    }

    #[test]
    fn provider_names_parse() {
        assert_eq!("AWS".parse::<ProviderKind>().unwrap(), ProviderKind::Aws);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gcp);
        assert!("azure".parse::<ProviderKind>().is_err());
    }
}
