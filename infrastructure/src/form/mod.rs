//! JSON form host
//!
//! Lets the pipeline fill a form described as a JSON document instead of
//! a live page.

mod document;
mod host;

pub use document::{FilledAnswer, FilledForm, FormDocument, FormDocumentError, FormField};
pub use host::JsonFormHost;
