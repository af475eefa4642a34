//! Provider configuration from TOML (`[providers]` section)

use super::super::issue::{ConfigIssue, ConfigIssueCode};
use docfiller_domain::{ProviderId, WeightTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One entry of the ordered `providers.weights` list
///
/// ```toml
/// [[providers.weights]]
/// provider = "gpt-5"
/// weight = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileWeightEntry {
    pub provider: String,
    pub weight: f64,
}

/// Connection settings for one provider.
///
/// Every field is optional; unset fields fall back to the built-in
/// endpoint for that provider (see [`FileEndpointConfig::builtin`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEndpointConfig {
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Direct API key (not recommended, use the env var instead)
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API, including the version path
    pub base_url: Option<String>,
    /// Model name sent with every request
    pub model: Option<String>,
    /// Request timeout
    pub timeout_seconds: Option<u64>,
}

/// A fully resolved endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub api_key_env: Option<String>,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

impl FileEndpointConfig {
    /// Built-in endpoint for a known provider
    pub fn builtin(provider: &ProviderId) -> Self {
        let (env, url, model) = match provider {
            ProviderId::Gpt5 => ("OPENAI_API_KEY", "https://api.openai.com/v1", "gpt-5"),
            ProviderId::Gpt4oMini => ("OPENAI_API_KEY", "https://api.openai.com/v1", "gpt-4o-mini"),
            ProviderId::ClaudeSonnet => (
                "ANTHROPIC_API_KEY",
                "https://api.anthropic.com/v1",
                "claude-sonnet-4-5",
            ),
            ProviderId::Gemini => (
                "GEMINI_API_KEY",
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-2.5-flash",
            ),
            ProviderId::Mistral => (
                "MISTRAL_API_KEY",
                "https://api.mistral.ai/v1",
                "mistral-large-latest",
            ),
            ProviderId::Ollama => {
                return Self {
                    base_url: Some("http://localhost:11434/v1".to_string()),
                    model: Some("llama3.2".to_string()),
                    ..Self::default()
                };
            }
            ProviderId::Custom(_) => return Self::default(),
        };
        Self {
            api_key_env: Some(env.to_string()),
            api_key: None,
            base_url: Some(url.to_string()),
            model: Some(model.to_string()),
            timeout_seconds: None,
        }
    }

    /// Fields set here win over `base`
    fn over(&self, base: Self) -> Self {
        Self {
            api_key_env: self.api_key_env.clone().or(base.api_key_env),
            api_key: self.api_key.clone().or(base.api_key),
            base_url: self.base_url.clone().or(base.base_url),
            model: self.model.clone().or(base.model),
            timeout_seconds: self.timeout_seconds.or(base.timeout_seconds),
        }
    }
}

/// Raw provider configuration from TOML
///
/// # Example
///
/// ```toml
/// [providers]
/// default = "gpt-5"
///
/// [[providers.weights]]
/// provider = "gpt-5"
/// weight = 2.0
///
/// [[providers.weights]]
/// provider = "mistral"
/// weight = 1.0
///
/// [providers.endpoints.mistral]
/// model = "mistral-small-latest"
/// timeout_seconds = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    /// Provider used when consensus is off
    pub default: Option<String>,
    /// Ordered consensus weights; empty means the built-in provider set
    pub weights: Vec<FileWeightEntry>,
    /// Per-provider endpoint overrides, keyed by provider id
    pub endpoints: BTreeMap<String, FileEndpointConfig>,
}

impl FileProvidersConfig {
    pub fn default_provider(&self) -> ProviderId {
        self.default
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Consensus weights before any stored override
    pub fn weight_table(&self) -> WeightTable {
        if self.weights.is_empty() {
            return WeightTable::uniform(ProviderId::default_providers());
        }
        let mut table = WeightTable::new();
        table.set(
            self.weights
                .iter()
                .filter_map(|w| w.provider.parse().ok().map(|p| (p, w.weight))),
        );
        table.normalize();
        table
    }

    /// Endpoint for `provider`: configured overrides over the built-in values
    pub fn endpoint(&self, provider: &ProviderId) -> ResolvedEndpoint {
        let builtin = FileEndpointConfig::builtin(provider);
        let merged = match self.endpoints.get(provider.as_str()) {
            Some(configured) => configured.over(builtin),
            None => builtin,
        };
        ResolvedEndpoint {
            api_key_env: merged.api_key_env,
            api_key: merged.api_key,
            base_url: merged.base_url.unwrap_or_default(),
            model: merged.model.unwrap_or_else(|| provider.as_str().to_string()),
            timeout_seconds: merged.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    pub(crate) fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if let Some(default) = &self.default
            && default.trim().is_empty()
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyProviderName {
                    field: "providers.default".to_string(),
                },
                "providers.default: provider name cannot be empty",
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.weights {
            if entry.provider.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyProviderName {
                        field: "providers.weights".to_string(),
                    },
                    "providers.weights: provider name cannot be empty",
                ));
                continue;
            }
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidWeight {
                        provider: entry.provider.clone(),
                    },
                    format!(
                        "providers.weights: weight {} for '{}' is invalid, treating it as 0",
                        entry.weight, entry.provider
                    ),
                ));
            }
            if !seen.insert(entry.provider.trim()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateWeight {
                        provider: entry.provider.clone(),
                    },
                    format!(
                        "providers.weights: '{}' is listed more than once, the last entry wins",
                        entry.provider
                    ),
                ));
            }
        }

        if !self.weights.is_empty() && self.weight_table().active().next().is_none() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::NoActiveProviders,
                "providers.weights: no provider has a positive weight, consensus runs will fail",
            ));
        }

        for (name, endpoint) in &self.endpoints {
            if endpoint.timeout_seconds == Some(0) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidTimeout {
                        provider: name.clone(),
                    },
                    format!("providers.endpoints.{}: timeout_seconds cannot be 0", name),
                ));
            }
            if endpoint
                .base_url
                .as_deref()
                .is_some_and(|u| u.trim().is_empty())
            {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyBaseUrl {
                        provider: name.clone(),
                    },
                    format!("providers.endpoints.{}: base_url cannot be empty", name),
                ));
            }
        }

        issues
    }
}
