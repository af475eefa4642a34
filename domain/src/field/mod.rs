//! Form field domain
//!
//! What the core knows about a field: its widget category ([`FieldType`])
//! and the context extracted from the UI ([`FieldValue`]).

pub mod field_type;
pub mod value;

pub use field_type::{AnswerShape, DateGranularity, FieldType};
pub use value::{FieldHandle, FieldValue};
