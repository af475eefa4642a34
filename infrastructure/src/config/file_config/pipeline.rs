//! Pipeline configuration from TOML (`[pipeline]` section)

use docfiller_application::FillOptions;
use docfiller_domain::ProviderId;
use serde::{Deserialize, Serialize};

/// Raw pipeline configuration from TOML
///
/// These values are host defaults: anything the user saved in the
/// settings store wins over them.
///
/// # Example
///
/// ```toml
/// [pipeline]
/// consensus = true
/// skip_marked = true
/// dim_skipped = false
/// profile = "default"
/// magic_prompt = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Ask every weighted provider and merge the answers
    pub consensus: bool,
    /// Leave fields the user already answered alone
    pub skip_marked: bool,
    /// Mark skipped fields in the output
    pub dim_skipped: bool,
    /// Selected profile key
    pub profile: Option<String>,
    /// Generate the system prompt for magic profiles before filling
    pub magic_prompt: bool,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        Self {
            consensus: false,
            skip_marked: true,
            dim_skipped: true,
            profile: None,
            magic_prompt: true,
        }
    }
}

impl FilePipelineConfig {
    pub fn fill_options(&self, provider: ProviderId) -> FillOptions {
        FillOptions {
            consensus: self.consensus,
            provider,
            skip_marked: self.skip_marked,
            dim_skipped: self.dim_skipped,
            profile_key: self
                .profile
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            magic_prompt: self.magic_prompt,
        }
    }
}
