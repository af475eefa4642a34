//! Application-level configuration.
//!
//! [`FillOptions`] controls how a form-filling run behaves. Hosts seed the
//! defaults from their configuration; user settings stored in the
//! [`SettingsStore`](crate::ports::settings_store::SettingsStore) take
//! precedence over them.

use docfiller_domain::ProviderId;

/// Run behavior configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOptions {
    /// Fan out to every weighted provider instead of asking one
    pub consensus: bool,
    /// Provider used when consensus is off
    pub provider: ProviderId,
    /// Leave fields the user already answered untouched
    pub skip_marked: bool,
    /// Visually mark skipped fields
    pub dim_skipped: bool,
    /// Answering profile, the built-in default when unset
    pub profile_key: Option<String>,
    /// Generate the system prompt for magic profiles before filling
    pub magic_prompt: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            consensus: false,
            provider: ProviderId::default(),
            skip_marked: true,
            dim_skipped: true,
            profile_key: None,
            magic_prompt: true,
        }
    }
}

impl FillOptions {
    pub fn with_consensus(mut self, enabled: bool) -> Self {
        self.consensus = enabled;
        self
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_profile(mut self, key: impl Into<String>) -> Self {
        self.profile_key = Some(key.into());
        self
    }

    /// Name recorded in run metrics for the answering side
    pub fn model_label(&self) -> String {
        if self.consensus {
            "consensus".to_string()
        } else {
            self.provider.to_string()
        }
    }
}
