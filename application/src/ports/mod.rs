//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod form;
pub mod metrics_recorder;
pub mod progress;
pub mod provider;
pub mod settings_store;
