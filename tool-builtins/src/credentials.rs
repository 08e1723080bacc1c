//! Credential verification tools.
//!
//! Each tool runs the provider's presence, shape and live stages and maps a
//! [`CredentialError`] onto the invocation error taxonomy, keeping the
//! provider's structured details.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tool_config::{AwsSettings, GcpSettings, ToolboxConfig};
use tool_credentials::{
    AwsConfig, AwsProvider, CredentialCheck, CredentialError, CredentialResult, GcpConfig,
    GcpProvider, ProviderKind, VerifiedIdentity,
};
use tool_primitives::Environment;
use tool_registry::{Tool, ToolDescriptor, ToolError, ToolRegistry, ToolResult};

use crate::BuiltinsError;
use crate::names::{VERIFY_ANY, VERIFY_AWS, VERIFY_GCP};

/// Builds the AWS provider from configuration.
///
/// # Errors
///
/// Returns [`CredentialError::Configuration`] for an invalid endpoint.
pub fn aws_provider(settings: &AwsSettings) -> CredentialResult<AwsProvider> {
    let mut config = AwsConfig::new()
        .with_default_region(settings.default_region.clone())
        .with_timeout(settings.timeout());
    if let Some(endpoint) = &settings.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    AwsProvider::new(config)
}

/// Builds the GCP provider from configuration.
///
/// # Errors
///
/// Returns [`CredentialError::Configuration`] for an invalid token endpoint.
pub fn gcp_provider(settings: &GcpSettings) -> CredentialResult<GcpProvider> {
    let mut config = GcpConfig::new()
        .with_credentials_env(settings.credentials_env.clone())
        .with_scope(settings.scope.clone())
        .with_timeout(settings.timeout());
    if let Some(uri) = &settings.token_uri {
        config = config.with_token_uri(uri.clone());
    }
    GcpProvider::new(config)
}

/// Verifies the credentials of a single provider.
pub struct VerifyCredentials {
    provider: Arc<dyn CredentialCheck>,
    env: Arc<dyn Environment>,
}

impl VerifyCredentials {
    /// Creates the tool for `provider`, reading credentials from `env`.
    #[must_use]
    pub fn new(provider: Arc<dyn CredentialCheck>, env: Arc<dyn Environment>) -> Self {
        Self { provider, env }
    }
}

#[async_trait]
impl Tool for VerifyCredentials {
    async fn invoke(&self, _arguments: Value) -> ToolResult<Value> {
        check(self.provider.as_ref(), self.env.as_ref()).await
    }
}

/// Verifies the credentials of the provider named by the `provider` argument.
pub struct VerifyAnyCredentials {
    providers: HashMap<ProviderKind, Arc<dyn CredentialCheck>>,
    env: Arc<dyn Environment>,
}

#[derive(Deserialize)]
struct VerifyAnyArgs {
    provider: String,
}

impl VerifyAnyCredentials {
    /// Creates the tool over `providers`, keyed by their own kind.
    #[must_use]
    pub fn new(
        providers: impl IntoIterator<Item = Arc<dyn CredentialCheck>>,
        env: Arc<dyn Environment>,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.provider_kind(), provider))
            .collect();
        Self { providers, env }
    }
}

#[async_trait]
impl Tool for VerifyAnyCredentials {
    async fn invoke(&self, arguments: Value) -> ToolResult<Value> {
        let args: VerifyAnyArgs = serde_json::from_value(arguments)?;
        let kind: ProviderKind = args
            .provider
            .parse()
            .map_err(|err: CredentialError| ToolError::invalid_arguments(err.to_string()))?;
        let provider = self.providers.get(&kind).ok_or_else(|| {
            ToolError::invalid_arguments(format!("provider `{kind}` is not enabled"))
        })?;
        check(provider.as_ref(), self.env.as_ref()).await
    }
}

async fn check(provider: &dyn CredentialCheck, env: &dyn Environment) -> ToolResult<Value> {
    let identity = provider.check(env).await.map_err(into_tool_error)?;
    identity_payload(&identity)
}

fn identity_payload(identity: &VerifiedIdentity) -> ToolResult<Value> {
    serde_json::to_value(identity)
        .map_err(|err| ToolError::execution(format!("failed to encode identity: {err}")))
}

/// Maps a credential failure onto a classified tool error.
#[must_use]
pub fn into_tool_error(err: CredentialError) -> ToolError {
    ToolError::failed(err.kind(), err.to_string(), err.details())
}

pub(crate) fn register(
    registry: &mut ToolRegistry,
    config: &ToolboxConfig,
    env: Arc<dyn Environment>,
) -> Result<(), BuiltinsError> {
    let aws: Arc<dyn CredentialCheck> = Arc::new(aws_provider(&config.aws)?);
    let gcp: Arc<dyn CredentialCheck> = Arc::new(gcp_provider(&config.gcp)?);
    let no_arguments = json!({ "type": "object", "properties": {} });

    registry.register_tool(
        ToolDescriptor::new(VERIFY_AWS)?
            .with_description(
                "Verify AWS credentials from the environment with an STS GetCallerIdentity call.",
            )
            .with_input_schema(no_arguments.clone()),
        VerifyCredentials::new(Arc::clone(&aws), Arc::clone(&env)),
    )?;

    registry.register_tool(
        ToolDescriptor::new(VERIFY_GCP)?
            .with_description(
                "Verify the GCP service-account key named by the environment with a token grant.",
            )
            .with_input_schema(no_arguments),
        VerifyCredentials::new(Arc::clone(&gcp), Arc::clone(&env)),
    )?;

    registry.register_tool(
        ToolDescriptor::new(VERIFY_ANY)?
            .with_description("Verify cloud credentials for the named provider.")
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "provider": { "type": "string", "enum": ["aws", "gcp"] }
                },
                "required": ["provider"]
            })),
        VerifyAnyCredentials::new([aws, gcp], env),
    )?;

    Ok(())
}
