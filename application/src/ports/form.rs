//! Form host ports
//!
//! The collaborators a form-filling run needs from its host: where the
//! fields come from, what they are, and how answers get written back. A
//! browser extension would implement these against the DOM; the CLI
//! implements them against a JSON document.

use async_trait::async_trait;
use docfiller_domain::{AnswerPayload, FieldHandle, FieldType, FieldValue, PromptTemplate};
use thiserror::Error;

/// Failure of a form collaborator while handling one field
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("Field {0} not found")]
    NotFound(String),

    #[error("Could not extract field {handle}: {message}")]
    Extraction { handle: String, message: String },

    #[error("Could not fill field {handle}: {message}")]
    Fill { handle: String, message: String },

    #[error("Other error: {0}")]
    Other(String),
}

/// Lists the fields of the current form
#[async_trait]
pub trait FieldSource: Send + Sync {
    /// Fields in document order
    async fn extract_fields(&self) -> Result<Vec<FieldHandle>, FieldError>;
}

/// Decides the widget category of a field
#[async_trait]
pub trait FieldClassifier: Send + Sync {
    /// `None` when the field cannot be classified
    async fn classify(&self, handle: &FieldHandle) -> Option<FieldType>;
}

/// Reads a field's title, description, options and grid labels
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(
        &self,
        handle: &FieldHandle,
        field_type: FieldType,
    ) -> Result<FieldValue, FieldError>;
}

/// Detects fields the user has already answered
#[async_trait]
pub trait PrefilledChecker: Send + Sync {
    async fn is_already_answered(&self, field_type: FieldType, field: &FieldValue) -> bool;
}

/// Builds the field-specific prompt body
pub trait PromptBuilder: Send + Sync {
    fn build_prompt(&self, field_type: FieldType, field: &FieldValue) -> String;
}

/// The built-in prompt templates
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePromptBuilder;

impl PromptBuilder for TemplatePromptBuilder {
    fn build_prompt(&self, field_type: FieldType, field: &FieldValue) -> String {
        PromptTemplate::field_prompt(field_type, field)
    }
}

/// Writes answers back into the form
#[async_trait]
pub trait Filler: Send + Sync {
    /// Returns whether the answer was written
    async fn fill(
        &self,
        field_type: FieldType,
        field: &FieldValue,
        answer: &AnswerPayload,
    ) -> Result<bool, FieldError>;

    /// Visually mark a field that was skipped because it was already answered
    async fn mark_skipped(&self, _field: &FieldValue) {}
}
