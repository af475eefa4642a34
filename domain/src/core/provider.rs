//! Provider identifier value object

use super::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A source of candidate answers (Value Object)
///
/// Each provider maps to one model backend. The known set covers the
/// backends the form filler ships with; anything else is carried as
/// [`ProviderId::Custom`] so new backends can be configured without a
/// code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Gpt5,
    Gpt4oMini,
    ClaudeSonnet,
    Gemini,
    Mistral,
    Ollama,
    Custom(String),
}

impl ProviderId {
    /// Get the string identifier for this provider
    pub fn as_str(&self) -> &str {
        match self {
            ProviderId::Gpt5 => "gpt-5",
            ProviderId::Gpt4oMini => "gpt-4o-mini",
            ProviderId::ClaudeSonnet => "claude-sonnet",
            ProviderId::Gemini => "gemini",
            ProviderId::Mistral => "mistral",
            ProviderId::Ollama => "ollama",
            ProviderId::Custom(s) => s,
        }
    }

    /// Human-readable name, as shown in settings screens and metrics
    pub fn display_name(&self) -> &str {
        match self {
            ProviderId::Gpt5 => "GPT-5",
            ProviderId::Gpt4oMini => "GPT-4o mini",
            ProviderId::ClaudeSonnet => "Claude Sonnet",
            ProviderId::Gemini => "Gemini",
            ProviderId::Mistral => "Mistral",
            ProviderId::Ollama => "Ollama",
            ProviderId::Custom(s) => s,
        }
    }

    /// Whether this provider cannot be used without an API key.
    ///
    /// Local backends (Ollama) and custom endpoints are assumed to handle
    /// authentication themselves.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderId::Ollama | ProviderId::Custom(_))
    }

    /// Providers configured when the user has not chosen any
    pub fn default_providers() -> Vec<ProviderId> {
        vec![ProviderId::Gpt5, ProviderId::ClaudeSonnet, ProviderId::Gemini]
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        ProviderId::Gpt5
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "" => return Err(DomainError::InvalidProvider(s.to_string())),
            "gpt-5" => ProviderId::Gpt5,
            "gpt-4o-mini" => ProviderId::Gpt4oMini,
            "claude-sonnet" => ProviderId::ClaudeSonnet,
            "gemini" => ProviderId::Gemini,
            "mistral" => ProviderId::Mistral,
            "ollama" => ProviderId::Ollama,
            other => ProviderId::Custom(other.to_string()),
        })
    }
}

impl Serialize for ProviderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
