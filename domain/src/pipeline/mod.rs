//! Form-filling pipeline domain
//!
//! The phases of a run and the metrics it produces. The state machine that
//! drives them lives in the application layer.

pub mod metrics;
pub mod phase;

pub use metrics::RunMetrics;
pub use phase::RunPhase;
