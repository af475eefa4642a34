//! Answer domain
//!
//! Raw provider output ([`RawAnswer`]), the typed answer shapes
//! ([`AnswerPayload`]) and the pure [`AnswerValidator`].

pub mod payload;
pub mod raw;
pub mod validation;

pub use payload::{AnswerPayload, DateAnswer, GridRowSelections, GridSelection, OptionChoice};
pub use raw::RawAnswer;
pub use validation::AnswerValidator;
