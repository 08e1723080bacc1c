//! Strongly typed configuration schema.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Root configuration document.
///
/// ```toml
/// [server]
/// bind = "127.0.0.1:8001"
/// request_timeout_secs = 30
///
/// [logging]
/// filter = "info,tool_dispatch=debug"
///
/// [tools]
/// delay_max_secs = 60
/// placeholders = false
///
/// [aws]
/// default_region = "us-east-1"
///
/// [gcp]
/// credentials_env = "GOOGLE_APPLICATION_CREDENTIALS"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolboxConfig {
    /// HTTP shell settings.
    pub server: ServerConfig,
    /// Tracing subscriber settings.
    pub logging: LoggingConfig,
    /// Built-in tool settings.
    pub tools: ToolsConfig,
    /// AWS verification settings.
    pub aws: AwsSettings,
    /// GCP verification settings.
    pub gcp: GcpSettings,
}

impl ToolboxConfig {
    /// Checks constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated constraint.
    pub fn validate(&self) -> ConfigResult<()> {
        let max = self.tools.delay_max_secs;
        if !max.is_finite() || max < 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!("tools.delay_max_secs must be a non-negative number, got {max}"),
            });
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "server.request_timeout_secs must be positive".into(),
            });
        }
        if self.aws.timeout_secs == 0 || self.gcp.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "provider timeouts must be positive".into(),
            });
        }
        if self.gcp.credentials_env.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "gcp.credentials_env must name a variable".into(),
            });
        }
        Ok(())
    }
}

/// HTTP shell settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Upper bound on one request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8001)),
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Tracing subscriber settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    /// Include the event target in output.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            with_target: false,
        }
    }
}

/// Built-in tool settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Longest duration the `sleep` tool accepts, in seconds.
    pub delay_max_secs: f64,
    /// Register the `search` and `fetch` placeholder tools.
    pub placeholders: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            delay_max_secs: 60.0,
            placeholders: false,
        }
    }
}

/// AWS verification settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsSettings {
    /// Region used when neither `AWS_REGION` nor `AWS_DEFAULT_REGION` is set.
    pub default_region: String,
    /// STS endpoint override.
    pub endpoint: Option<String>,
    /// Live check timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".into(),
            endpoint: None,
            timeout_secs: 10,
        }
    }
}

impl AwsSettings {
    /// Live check timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// GCP verification settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpSettings {
    /// Variable naming the service-account key file.
    pub credentials_env: String,
    /// Token endpoint override; takes precedence over the key file's `token_uri`.
    pub token_uri: Option<String>,
    /// OAuth scope requested by the live check.
    pub scope: String,
    /// Live check timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for GcpSettings {
    fn default() -> Self {
        Self {
            credentials_env: "GOOGLE_APPLICATION_CREDENTIALS".into(),
            token_uri: None,
            scope: "https://www.googleapis.com/auth/cloud-platform".into(),
            timeout_secs: 10,
        }
    }
}

impl GcpSettings {
    /// Live check timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
