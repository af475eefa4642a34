//! Provider factory backed by the `[providers]` configuration

use crate::config::{FileProvidersConfig, ResolvedEndpoint};
use docfiller_application::{ProviderClient, ProviderFactory, ProviderInitError};
use docfiller_domain::ProviderId;
use std::sync::Arc;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds HTTP clients for configured providers.
///
/// API keys come from `api_key` in the endpoint config, else from the
/// endpoint's `api_key_env` variable.
pub struct HttpProviderFactory {
    config: FileProvidersConfig,
    env: EnvLookup,
}

impl HttpProviderFactory {
    pub fn new(config: FileProvidersConfig) -> Self {
        Self {
            config,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the environment lookup (used by tests)
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Endpoint and key for `provider`, or why it cannot be built
    fn resolve(
        &self,
        provider: &ProviderId,
    ) -> Result<(ResolvedEndpoint, Option<String>), ProviderInitError> {
        let endpoint = self.config.endpoint(provider);
        if endpoint.base_url.trim().is_empty() {
            return Err(ProviderInitError::MissingEndpoint {
                provider: provider.clone(),
            });
        }

        let api_key = endpoint
            .api_key
            .clone()
            .or_else(|| endpoint.api_key_env.as_deref().and_then(|name| (self.env)(name)))
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() && provider.requires_api_key() {
            return Err(ProviderInitError::MissingApiKey {
                provider: provider.clone(),
                env_var: endpoint
                    .api_key_env
                    .clone()
                    .unwrap_or_else(|| "an API key variable".to_string()),
            });
        }

        Ok((endpoint, api_key))
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, provider: &ProviderId) -> Result<Arc<dyn ProviderClient>, ProviderInitError> {
        let (endpoint, api_key) = self.resolve(provider)?;
        build_client(provider, endpoint, api_key)
    }

    fn check(&self, provider: &ProviderId) -> Result<(), ProviderInitError> {
        self.resolve(provider).map(|_| ())
    }
}

#[cfg(feature = "http")]
fn build_client(
    provider: &ProviderId,
    endpoint: ResolvedEndpoint,
    api_key: Option<String>,
) -> Result<Arc<dyn ProviderClient>, ProviderInitError> {
    let client = super::openai_compat::OpenAiCompatClient::new(provider.clone(), endpoint, api_key)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "http"))]
fn build_client(
    provider: &ProviderId,
    _endpoint: ResolvedEndpoint,
    _api_key: Option<String>,
) -> Result<Arc<dyn ProviderClient>, ProviderInitError> {
    Err(ProviderInitError::Construction {
        provider: provider.clone(),
        message: "built without the `http` feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileEndpointConfig;

    fn factory_with_env(vars: &'static [(&'static str, &'static str)]) -> HttpProviderFactory {
        HttpProviderFactory::new(FileProvidersConfig::default()).with_env(move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_missing_key_names_env_var() {
        let factory = factory_with_env(&[]);
        let err = factory.check(&ProviderId::Mistral).unwrap_err();
        assert_eq!(
            err,
            ProviderInitError::MissingApiKey {
                provider: ProviderId::Mistral,
                env_var: "MISTRAL_API_KEY".to_string(),
            }
        );
    }

    #[test]
    fn test_key_from_env() {
        let factory = factory_with_env(&[("OPENAI_API_KEY", "sk-test")]);
        assert!(factory.check(&ProviderId::Gpt5).is_ok());
        assert!(factory.check(&ProviderId::Gemini).is_err());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let factory = factory_with_env(&[("OPENAI_API_KEY", "  ")]);
        assert!(factory.check(&ProviderId::Gpt5).is_err());
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let factory = factory_with_env(&[]);
        assert!(factory.check(&ProviderId::Ollama).is_ok());
    }

    #[test]
    fn test_custom_provider_needs_endpoint() {
        let id = ProviderId::Custom("lab".to_string());
        let factory = factory_with_env(&[]);
        assert_eq!(
            factory.check(&id).unwrap_err(),
            ProviderInitError::MissingEndpoint {
                provider: id.clone()
            }
        );

        let mut config = FileProvidersConfig::default();
        config.endpoints.insert(
            "lab".to_string(),
            FileEndpointConfig {
                base_url: Some("http://lab:8000/v1".to_string()),
                ..Default::default()
            },
        );
        let factory = HttpProviderFactory::new(config).with_env(|_| None);
        assert!(factory.check(&id).is_ok());
    }

    #[test]
    fn test_configured_key_wins_over_env() {
        let mut config = FileProvidersConfig::default();
        config.endpoints.insert(
            "gemini".to_string(),
            FileEndpointConfig {
                api_key: Some("inline".to_string()),
                ..Default::default()
            },
        );
        let factory = HttpProviderFactory::new(config).with_env(|_| None);
        let (_, key) = factory.resolve(&ProviderId::Gemini).unwrap();
        assert_eq!(key.as_deref(), Some("inline"));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_create_builds_client() {
        let factory = factory_with_env(&[("OPENAI_API_KEY", "sk-test")]);
        let client = factory.create(&ProviderId::Gpt5).unwrap();
        assert_eq!(client.provider(), &ProviderId::Gpt5);
    }
}
