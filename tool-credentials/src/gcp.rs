//! GCP service-account verification via the OAuth JWT-bearer grant.

use std::fmt;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hyper::Uri;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tool_primitives::Environment;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{CredentialError, CredentialResult};
use crate::http_client::{
    HyperClient, build_https_client, failure_for_status, parse_endpoint, post_form,
};
use crate::provider::{CredentialProvider, ProviderKind, VerifiedIdentity};

/// Variable naming the service-account key file by default.
pub const DEFAULT_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Token endpoint used when the key file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Scope requested by the verification grant.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REQUIRED_FIELDS: [&str; 5] = [
    "type",
    "project_id",
    "private_key_id",
    "private_key",
    "client_email",
];
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Configuration for the GCP provider.
#[derive(Clone, Debug)]
pub struct GcpConfig {
    credentials_env: String,
    token_uri: Option<String>,
    scope: String,
    timeout: Duration,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            credentials_env: DEFAULT_CREDENTIALS_ENV.to_owned(),
            token_uri: None,
            scope: DEFAULT_SCOPE.to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl GcpConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variable holding the key file path (or inline JSON).
    #[must_use]
    pub fn with_credentials_env(mut self, name: impl Into<String>) -> Self {
        self.credentials_env = name.into();
        self
    }

    /// Overrides the token endpoint named in the key file.
    #[must_use]
    pub fn with_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = Some(uri.into());
        self
    }

    /// Sets the OAuth scope requested during verification.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Key material located in the environment.
#[derive(Clone, Debug)]
pub struct GcpSource {
    origin: String,
    contents: String,
}

/// Parsed service-account key.
#[derive(Clone)]
pub struct ServiceAccountKey {
    project_id: String,
    client_email: String,
    private_key_id: String,
    token_uri: String,
    signing_key: EncodingKey,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Project the service account belongs to.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Service-account e-mail.
    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Token endpoint the assertion is sent to.
    #[must_use]
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }
}

/// Verifies a service-account key by exchanging a signed assertion for an
/// access token.
pub struct GcpProvider {
    client: HyperClient,
    config: GcpConfig,
}

impl fmt::Debug for GcpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GcpProvider {
    /// Creates a provider.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Configuration`] if the token endpoint
    /// override is not a valid URI.
    pub fn new(config: GcpConfig) -> CredentialResult<Self> {
        if let Some(uri) = &config.token_uri {
            parse_endpoint(ProviderKind::Gcp, uri)?;
        }
        Ok(Self {
            client: build_https_client(),
            config,
        })
    }

    fn assertion(&self, key: &ServiceAccountKey) -> CredentialResult<String> {
        let issued_at = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: &self.config.scope,
            aud: &key.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.private_key_id.clone());

        jsonwebtoken::encode(&header, &claims, &key.signing_key).map_err(|err| {
            CredentialError::malformed(
                self.kind(),
                format!("private_key cannot sign assertions: {err}"),
                Vec::new(),
            )
        })
    }
}

#[async_trait]
impl CredentialProvider for GcpProvider {
    type Source = GcpSource;
    type Credential = ServiceAccountKey;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gcp
    }

    fn locate(&self, env: &dyn Environment) -> CredentialResult<GcpSource> {
        let name = &self.config.credentials_env;
        let Some(value) = env.first_of(&[name.as_str()]) else {
            return Err(CredentialError::missing(
                self.kind(),
                format!("{name} is not set"),
            ));
        };

        if value.trim_start().starts_with('{') {
            return Ok(GcpSource {
                origin: format!("inline JSON in {name}"),
                contents: value,
            });
        }

        match fs::read_to_string(&value) {
            Ok(contents) => Ok(GcpSource {
                origin: value,
                contents,
            }),
            Err(err) if err.kind() == IoErrorKind::NotFound => Err(CredentialError::missing(
                self.kind(),
                format!("{name} points to `{value}`, which does not exist"),
            )),
            Err(err) => Err(CredentialError::missing(
                self.kind(),
                format!("{name} points to `{value}`, which cannot be read: {err}"),
            )),
        }
    }

    fn parse(&self, source: GcpSource) -> CredentialResult<ServiceAccountKey> {
        let GcpSource { origin, contents } = source;
        let document: Value = serde_json::from_str(&contents).map_err(|err| {
            CredentialError::malformed(
                self.kind(),
                format!("{origin} is not valid JSON: {err}"),
                Vec::new(),
            )
        })?;
        let Some(fields) = document.as_object() else {
            return Err(CredentialError::malformed(
                self.kind(),
                format!("{origin} is not a JSON object"),
                Vec::new(),
            ));
        };

        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|key| text(**key).is_none())
            .map(|key| (*key).to_owned())
            .collect();
        if !missing.is_empty() {
            return Err(CredentialError::malformed(
                self.kind(),
                format!("missing required fields: {}", missing.join(", ")),
                missing,
            ));
        }

        let raw: RawServiceAccount = serde_json::from_value(document).map_err(|err| {
            CredentialError::malformed(self.kind(), err.to_string(), Vec::new())
        })?;

        if raw.kind != "service_account" {
            return Err(CredentialError::malformed(
                self.kind(),
                format!("expected type `service_account`, found `{}`", raw.kind),
                Vec::new(),
            ));
        }

        let signing_key = EncodingKey::from_rsa_pem(raw.private_key.as_bytes()).map_err(|err| {
            CredentialError::malformed(
                self.kind(),
                format!("private_key is not a valid RSA PEM key: {err}"),
                Vec::new(),
            )
        })?;

        let token_uri = self
            .config
            .token_uri
            .clone()
            .or(raw.token_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_owned());

        Ok(ServiceAccountKey {
            project_id: raw.project_id,
            client_email: raw.client_email,
            private_key_id: raw.private_key_id,
            token_uri,
            signing_key,
        })
    }

    async fn verify(&self, key: &ServiceAccountKey) -> CredentialResult<VerifiedIdentity> {
        let endpoint: Uri = parse_endpoint(self.kind(), &key.token_uri)?;
        let assertion = self.assertion(key)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        debug!(endpoint = %endpoint, client_email = %key.client_email, "requesting gcp access token");
        let (status, bytes) = post_form(
            &self.client,
            self.kind(),
            &endpoint,
            &[],
            body,
            self.config.timeout,
        )
        .await?;

        if !status.is_success() {
            return Err(failure_for_status(
                self.kind(),
                status,
                oauth_error_message(&bytes),
            ));
        }

        let token: TokenResponse = serde_json::from_slice(&bytes).map_err(|err| {
            CredentialError::transport(self.kind(), format!("failed to decode token response: {err}"))
        })?;

        let mut identity = VerifiedIdentity::new(self.kind())
            .with("project_id", key.project_id.clone())
            .with("client_email", key.client_email.clone());
        if let Some(token_type) = token.token_type {
            identity = identity.with("token_type", token_type);
        }
        if let Some(expires_in) = token.expires_in {
            identity = identity.with("expires_in", expires_in);
        }
        Ok(identity)
    }
}

#[derive(Deserialize)]
struct RawServiceAccount {
    #[serde(rename = "type")]
    kind: String,
    project_id: String,
    private_key_id: String,
    private_key: String,
    client_email: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn oauth_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<OAuthError>(body) {
        Ok(OAuthError {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(OAuthError { error, .. }) => error,
        Err(_) => String::from_utf8_lossy(body).trim().to_owned(),
    }
}
