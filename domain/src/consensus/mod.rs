//! Weighted consensus domain
//!
//! Pure building blocks of a consensus round:
//!
//! - [`WeightTable`]: per-provider trust weights, normalized
//! - [`CandidateAnswer`]: one validated provider answer with its weight
//! - [`merge`]: reconciles the candidates of a round into one answer
//!
//! Fan-out, provider calls and cancellation live in the application layer.

pub mod candidate;
pub mod merge;
pub mod weights;

pub use candidate::{CandidateAnswer, ConsensusResult};
pub use merge::merge;
pub use weights::WeightTable;

/// Maximum number of valid responses collected per consensus round
pub const MAX_RESPONSES: usize = 10;
