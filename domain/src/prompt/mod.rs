//! Prompt domain
//!
//! Templates for the prompts sent to providers, and the [`Prompt`] a
//! provider receives.

mod template;

pub use template::PromptTemplate;

use serde::{Deserialize, Serialize};

/// A prompt as sent to a provider: the profile's system prompt plus the
/// field-specific body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub body: String,
}

impl Prompt {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            system: None,
            body: body.into(),
        }
    }

    /// Attach a system prompt; blank ones are ignored
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        self.system = (!system.trim().is_empty()).then_some(system);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}
