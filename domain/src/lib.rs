//! Domain layer for docfiller
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Fields and answers
//!
//! A form field has a [`FieldType`] (its widget category) and a
//! [`FieldValue`] (title, description, options, grid labels). Providers
//! answer with a [`RawAnswer`], which the [`AnswerValidator`] turns into a
//! typed [`AnswerPayload`] when it fits the field.
//!
//! ## Weighted consensus
//!
//! Several providers answer the same field; each valid answer becomes a
//! [`CandidateAnswer`] carrying its provider's weight from the
//! [`WeightTable`], and [`merge`] reconciles them into one answer.
//!
//! ## Runs
//!
//! A form-filling run moves through [`RunPhase`]s and produces
//! [`RunMetrics`]. The answering [`Profile`] supplies the system prompt.

pub mod answer;
pub mod consensus;
pub mod core;
pub mod field;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod util;

// Re-export commonly used types
pub use answer::{
    AnswerPayload, AnswerValidator, DateAnswer, GridRowSelections, GridSelection, OptionChoice,
    RawAnswer,
};
pub use consensus::{CandidateAnswer, ConsensusResult, MAX_RESPONSES, WeightTable, merge};
pub use core::{error::DomainError, provider::ProviderId};
pub use field::{AnswerShape, DateGranularity, FieldHandle, FieldType, FieldValue};
pub use pipeline::{RunMetrics, RunPhase};
pub use profile::{DEFAULT_PROFILE_KEY, MagicPrompt, Profile, ProfileCatalog};
pub use prompt::{Prompt, PromptTemplate};
