//! Provider ports
//!
//! Defines how the application layer talks to answer providers (model
//! backends). Implementations (adapters) live in the infrastructure layer.

use async_trait::async_trait;
use docfiller_domain::{FieldType, ProviderId, Prompt, RawAnswer};
use std::sync::Arc;
use thiserror::Error;

/// Errors from a single provider call
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Other error: {0}")]
    Other(String),
}

/// A provider that cannot be constructed.
///
/// Always attributed to exactly one provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderInitError {
    #[error("{provider}: missing API key (set {env_var} or providers.endpoints.{provider}.api_key)")]
    MissingApiKey { provider: ProviderId, env_var: String },

    #[error("{provider}: no endpoint configured")]
    MissingEndpoint { provider: ProviderId },

    #[error("{provider}: {message}")]
    Construction { provider: ProviderId, message: String },
}

impl ProviderInitError {
    pub fn provider(&self) -> &ProviderId {
        match self {
            ProviderInitError::MissingApiKey { provider, .. }
            | ProviderInitError::MissingEndpoint { provider }
            | ProviderInitError::Construction { provider, .. } => provider,
        }
    }
}

/// Client for one provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// The provider this client talks to
    fn provider(&self) -> &ProviderId;

    /// Ask the provider for an answer of the shape `field_type` expects.
    ///
    /// Timeouts and retries are the client's own policy; the caller only
    /// awaits the outcome.
    async fn invoke(&self, prompt: &Prompt, field_type: FieldType)
    -> Result<RawAnswer, ProviderError>;
}

/// Constructs provider clients
pub trait ProviderFactory: Send + Sync {
    fn create(&self, provider: &ProviderId) -> Result<Arc<dyn ProviderClient>, ProviderInitError>;

    /// Check that `provider` is configured well enough to be constructed.
    ///
    /// The default builds a client and discards it.
    fn check(&self, provider: &ProviderId) -> Result<(), ProviderInitError> {
        self.create(provider).map(|_| ())
    }
}
