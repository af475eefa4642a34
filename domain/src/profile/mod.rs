//! Answering profiles
//!
//! A profile carries the system prompt sent with every field prompt. One
//! built-in profile is always available; users add custom ones, and a
//! "magic" profile has its system prompt generated from the form itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the built-in profile, also the fallback selection
pub const DEFAULT_PROFILE_KEY: &str = "default";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that fills out forms accurately and concisely.
Start directly with the answer. Use simple, natural, and clear language.
Avoid unnecessary prefaces, emojis, or formatting. Provide plain text only.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_description: String,
    #[serde(default)]
    pub is_custom: bool,
    /// System prompt is generated from the form's questions before filling
    #[serde(default)]
    pub is_magic: bool,
}

impl Profile {
    pub fn custom(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            short_description: String::new(),
            is_custom: true,
            is_magic: false,
        }
    }

    pub fn magic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: String::new(),
            short_description: "Generates its prompt from the form".to_string(),
            is_custom: true,
            is_magic: true,
        }
    }

    /// The built-in "Form Assistant" profile
    pub fn form_assistant() -> Self {
        Self {
            name: "Form Assistant".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            short_description: "Accurate and concise form filler".to_string(),
            is_custom: false,
            is_magic: false,
        }
    }
}

/// Output of magic prompt generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicPrompt {
    #[serde(default)]
    pub subject_context: String,
    #[serde(default)]
    pub expertise_level: String,
    pub system_prompt: String,
}

/// Built-in profile merged with the user's custom ones
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCatalog {
    default_profile: Profile,
    custom: BTreeMap<String, Profile>,
}

impl ProfileCatalog {
    pub fn builtin() -> Self {
        Self {
            default_profile: Profile::form_assistant(),
            custom: BTreeMap::new(),
        }
    }

    pub fn is_builtin_key(key: &str) -> bool {
        key == DEFAULT_PROFILE_KEY
    }

    /// Catalog from stored custom profiles.
    ///
    /// Stored entries that shadow a built-in key are dropped unless they are
    /// custom or magic. Returns the catalog and whether anything was dropped,
    /// so the caller can write the cleaned map back.
    pub fn with_custom(custom: BTreeMap<String, Profile>) -> (Self, bool) {
        let mut catalog = Self::builtin();
        let mut dropped = false;
        for (key, profile) in custom {
            if Self::is_builtin_key(&key) && !(profile.is_custom || profile.is_magic) {
                dropped = true;
                continue;
            }
            catalog.custom.insert(key, profile);
        }
        (catalog, dropped)
    }

    /// Custom entries win over built-ins with the same key
    pub fn get(&self, key: &str) -> Option<&Profile> {
        match self.custom.get(key) {
            Some(profile) => Some(profile),
            None if Self::is_builtin_key(key) => Some(&self.default_profile),
            None => None,
        }
    }

    /// Profile for `key`, falling back to the built-in default
    pub fn resolve<'a>(&'a self, key: Option<&'a str>) -> (&'a str, &'a Profile) {
        match key.and_then(|k| self.get(k).map(|p| (k, p))) {
            Some(found) => found,
            None => (DEFAULT_PROFILE_KEY, self.get_default()),
        }
    }

    fn get_default(&self) -> &Profile {
        self.custom
            .get(DEFAULT_PROFILE_KEY)
            .unwrap_or(&self.default_profile)
    }

    pub fn custom_profiles(&self) -> &BTreeMap<String, Profile> {
        &self.custom
    }

    /// Insert or replace a custom entry
    pub fn upsert_custom(&mut self, key: impl Into<String>, profile: Profile) {
        self.custom.insert(key.into(), profile);
    }

    /// Remove a custom entry; built-ins cannot be removed
    pub fn remove_custom(&mut self, key: &str) -> Option<Profile> {
        self.custom.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(DEFAULT_PROFILE_KEY).chain(
            self.custom
                .keys()
                .map(String::as_str)
                .filter(|k| !Self::is_builtin_key(k)),
        )
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
