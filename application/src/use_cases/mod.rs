//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod fill_form;
pub mod magic_prompt;
