//! Core domain concepts shared across all subdomains.
//!
//! - [`provider::ProviderId`]: the sources that can answer a field
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod provider;
