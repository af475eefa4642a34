//! JSON form documents
//!
//! ```json
//! {
//!   "fields": [
//!     {"id": "q1", "type": "text", "title": "Your name"},
//!     {"id": "q2", "type": "multiple_choice", "title": "Colour",
//!      "options": ["Red", "Blue"], "answer": "Red"}
//!   ]
//! }
//! ```
//!
//! A field with a non-empty `answer` counts as already answered.

use docfiller_domain::{AnswerPayload, FieldHandle, FieldValue, RunMetrics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormDocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid form document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDocument {
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    /// Field type id (`text`, `linear_scale`, ...); unknown ids are skipped
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Existing answer, if the user already filled the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
}

impl FormField {
    pub fn handle(&self) -> FieldHandle {
        FieldHandle::new(&self.id)
    }

    pub fn to_field_value(&self) -> FieldValue {
        FieldValue {
            handle: self.handle(),
            title: self.title.clone(),
            description: self
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            options: self.options.clone(),
            rows: self.rows.clone(),
            columns: self.columns.clone(),
        }
    }

    /// Whether the document already carries an answer for this field
    pub fn is_answered(&self) -> bool {
        match &self.answer {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }
}

impl FormDocument {
    pub fn from_json(text: &str) -> Result<Self, FormDocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FormDocumentError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// One answer written back by the filler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledAnswer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: AnswerPayload,
}

/// Output document of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledForm {
    pub answers: Vec<FilledAnswer>,
    /// Already answered fields that were left alone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,
}

impl FilledForm {
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), FormDocumentError> {
        let text = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }
}
