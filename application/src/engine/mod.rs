//! Consensus engine, its provider pool and the host-owned lifecycle

pub mod consensus;
pub mod context;
pub mod pool;

pub use consensus::{ConsensusEngine, ConsensusError};
pub use context::EngineContext;
pub use pool::ProviderPool;
