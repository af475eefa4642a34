//! Application layer for docfiller
//!
//! This crate contains port definitions, the consensus engine, settings
//! access and the form-filling use case. It depends only on the domain layer.

pub mod config;
pub mod engine;
pub mod ports;
pub mod settings;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::FillOptions;
pub use engine::{ConsensusEngine, ConsensusError, EngineContext, ProviderPool};
pub use ports::{
    form::{
        FieldClassifier, FieldError, FieldExtractor, FieldSource, Filler, PrefilledChecker,
        PromptBuilder, TemplatePromptBuilder,
    },
    metrics_recorder::{MetricsError, MetricsRecorder, NoMetrics},
    progress::{NoProgress, PipelineProgress, SkipReason},
    provider::{ProviderClient, ProviderError, ProviderFactory, ProviderInitError},
    settings_store::{SettingsError, SettingsStore},
};
pub use settings::Settings;
pub use use_cases::fill_form::{
    FieldOutcome, FieldStatus, FillFormError, FillFormUseCase, FormCollaborators, RunReport,
};
pub use use_cases::magic_prompt::{GenerateMagicPromptUseCase, MagicPromptError};
