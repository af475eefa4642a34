//! Typed settings facade
//!
//! Wraps a [`SettingsStore`] with the keys and value types the run uses.
//! Missing keys fall back to the host-supplied defaults.

use crate::config::FillOptions;
use crate::ports::settings_store::{SettingsError, SettingsStore};
use docfiller_domain::{Profile, ProfileCatalog, ProviderId, WeightTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Storage keys
pub mod keys {
    pub const CONSENSUS: &str = "consensus";
    pub const LLM_WEIGHTS: &str = "llmWeights";
    pub const LLM_MODEL: &str = "llmModel";
    pub const SKIP_MARKED: &str = "skipMarkedQuestions";
    pub const DIM_SKIPPED: &str = "enableOpacityOnSkippedQuestions";
    pub const SELECTED_PROFILE: &str = "selectedProfileKey";
    pub const CUSTOM_PROFILES: &str = "customProfiles";
}

#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
    defaults: FillOptions,
}

impl Settings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            defaults: FillOptions::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: FillOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &FillOptions {
        &self.defaults
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        match self.store.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                SettingsError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }

    async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        self.store.set(key, serde_json::to_value(value)?).await
    }

    pub async fn consensus_enabled(&self) -> Result<bool, SettingsError> {
        Ok(self.get(keys::CONSENSUS).await?.unwrap_or(self.defaults.consensus))
    }

    pub async fn set_consensus_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.set(keys::CONSENSUS, &enabled).await
    }

    /// Stored provider weights in configuration order, `None` if never saved
    pub async fn llm_weights(&self) -> Result<Option<Vec<(ProviderId, f64)>>, SettingsError> {
        self.get(keys::LLM_WEIGHTS).await
    }

    pub async fn set_llm_weights(&self, weights: &WeightTable) -> Result<(), SettingsError> {
        let pairs: Vec<(&str, f64)> = weights.iter().map(|(p, w)| (p.as_str(), w)).collect();
        self.set(keys::LLM_WEIGHTS, &pairs).await
    }

    /// Provider used when consensus is off
    pub async fn llm_model(&self) -> Result<ProviderId, SettingsError> {
        Ok(self
            .get(keys::LLM_MODEL)
            .await?
            .unwrap_or_else(|| self.defaults.provider.clone()))
    }

    pub async fn set_llm_model(&self, provider: &ProviderId) -> Result<(), SettingsError> {
        self.set(keys::LLM_MODEL, provider).await
    }

    pub async fn skip_marked(&self) -> Result<bool, SettingsError> {
        Ok(self.get(keys::SKIP_MARKED).await?.unwrap_or(self.defaults.skip_marked))
    }

    pub async fn set_skip_marked(&self, enabled: bool) -> Result<(), SettingsError> {
        self.set(keys::SKIP_MARKED, &enabled).await
    }

    pub async fn dim_skipped(&self) -> Result<bool, SettingsError> {
        Ok(self.get(keys::DIM_SKIPPED).await?.unwrap_or(self.defaults.dim_skipped))
    }

    pub async fn set_dim_skipped(&self, enabled: bool) -> Result<(), SettingsError> {
        self.set(keys::DIM_SKIPPED, &enabled).await
    }

    /// Selected profile key, `None` for the built-in default
    pub async fn selected_profile_key(&self) -> Result<Option<String>, SettingsError> {
        let stored: Option<String> = self.get(keys::SELECTED_PROFILE).await?;
        Ok(stored
            .filter(|k| !k.is_empty())
            .or_else(|| self.defaults.profile_key.clone()))
    }

    pub async fn set_selected_profile_key(&self, key: &str) -> Result<(), SettingsError> {
        self.set(keys::SELECTED_PROFILE, &key).await
    }

    /// Load the profile catalog.
    ///
    /// Stored entries shadowing a built-in key are dropped and the cleaned
    /// map is written back.
    pub async fn load_profiles(&self) -> Result<ProfileCatalog, SettingsError> {
        let stored: BTreeMap<String, Profile> =
            self.get(keys::CUSTOM_PROFILES).await?.unwrap_or_default();
        let (catalog, dropped) = ProfileCatalog::with_custom(stored);
        if dropped {
            info!("Dropping stored profiles that shadow built-in ones");
            self.set(keys::CUSTOM_PROFILES, catalog.custom_profiles()).await?;
        }
        Ok(catalog)
    }

    /// Insert or replace one custom profile
    pub async fn save_custom_profile(&self, key: &str, profile: Profile) -> Result<(), SettingsError> {
        let mut stored: BTreeMap<String, Profile> =
            self.get(keys::CUSTOM_PROFILES).await?.unwrap_or_default();
        stored.insert(key.to_string(), profile);
        debug!("Saving custom profile {}", key);
        self.set(keys::CUSTOM_PROFILES, &stored).await
    }

    /// Delete a custom profile, clearing the selection if it pointed there
    pub async fn delete_profile(&self, key: &str) -> Result<(), SettingsError> {
        let mut stored: BTreeMap<String, Profile> =
            self.get(keys::CUSTOM_PROFILES).await?.unwrap_or_default();
        stored.remove(key);
        self.set(keys::CUSTOM_PROFILES, &stored).await?;

        let selected: Option<String> = self.get(keys::SELECTED_PROFILE).await?;
        if selected.as_deref() == Some(key) {
            self.set(keys::SELECTED_PROFILE, &"").await?;
        }
        Ok(())
    }

    /// Effective run options: stored values over host defaults
    pub async fn fill_options(&self) -> Result<FillOptions, SettingsError> {
        Ok(FillOptions {
            consensus: self.consensus_enabled().await?,
            provider: self.llm_model().await?,
            skip_marked: self.skip_marked().await?,
            dim_skipped: self.dim_skipped().await?,
            profile_key: self.selected_profile_key().await?,
            magic_prompt: self.defaults.magic_prompt,
        })
    }
}
