//! Host-owned engine lifecycle
//!
//! One [`EngineContext`] per host context (browser tab, CLI process) owns at
//! most one live [`ConsensusEngine`]. The host decides when to build and
//! when to dispose it; nothing is global.

use super::consensus::ConsensusEngine;
use super::pool::ProviderPool;
use crate::ports::provider::ProviderFactory;
use crate::settings::Settings;
use docfiller_domain::WeightTable;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct EngineContext {
    factory: Arc<dyn ProviderFactory>,
    settings: Settings,
    /// Weights used when none are stored
    default_weights: WeightTable,
    engine: Mutex<Option<Arc<ConsensusEngine>>>,
}

impl EngineContext {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        settings: Settings,
        default_weights: WeightTable,
    ) -> Self {
        Self {
            factory,
            settings,
            default_weights,
            engine: Mutex::new(None),
        }
    }

    /// The shared engine, built on first use.
    ///
    /// Stored weights are layered over the defaults once, when the engine
    /// is built, then normalized.
    pub async fn acquire(&self) -> Arc<ConsensusEngine> {
        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.as_ref()
            && !engine.is_disposed()
        {
            return Arc::clone(engine);
        }

        let mut weights = self.default_weights.clone();
        match self.settings.llm_weights().await {
            Ok(Some(stored)) => weights.set(stored),
            Ok(None) => debug!("No stored provider weights, using defaults"),
            Err(e) => warn!("Could not load provider weights, using defaults: {}", e),
        }

        let engine = Arc::new(ConsensusEngine::new(
            ProviderPool::new(Arc::clone(&self.factory)),
            weights,
        ));
        debug!("Consensus engine built");
        *slot = Some(Arc::clone(&engine));
        engine
    }

    /// Dispose the current engine; the next `acquire` builds a fresh one
    pub async fn dispose(&self) {
        if let Some(engine) = self.engine.lock().await.take() {
            engine.dispose().await;
        }
    }

    pub async fn is_active(&self) -> bool {
        self.engine.lock().await.is_some()
    }

    pub fn factory(&self) -> &Arc<dyn ProviderFactory> {
        &self.factory
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::consensus::ConsensusError;
    use crate::settings::keys;
    use crate::testing::{MemoryStore, MockFactory, MockProvider};
    use docfiller_domain::{FieldHandle, FieldType, FieldValue, Prompt, ProviderId};
    use serde_json::json;

    fn context(store: Arc<MemoryStore>) -> EngineContext {
        let factory = MockFactory::new()
            .with(MockProvider::text("gpt-5", "x"))
            .with(MockProvider::text("gemini", "y"));
        EngineContext::new(
            Arc::new(factory),
            Settings::new(store),
            WeightTable::uniform([ProviderId::Gpt5, ProviderId::Gemini]),
        )
    }

    #[tokio::test]
    async fn test_acquire_returns_shared_engine() {
        let ctx = context(Arc::new(MemoryStore::default()));
        let a = ctx.acquire().await;
        let b = ctx.acquire().await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_stored_weights_override_defaults() {
        let store = Arc::new(MemoryStore::default());
        store.insert(keys::LLM_WEIGHTS, json!([["gemini", 3.0], ["gpt-5", 1.0]]));
        let ctx = context(store);

        let weights = ctx.acquire().await.weights().await;
        assert_eq!(weights.get(&ProviderId::Gemini), Some(0.75));
        assert_eq!(weights.get(&ProviderId::Gpt5), Some(0.25));
    }

    #[tokio::test]
    async fn test_invalid_stored_weights_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::default());
        store.insert(keys::LLM_WEIGHTS, json!("not a list"));
        let ctx = context(store);

        let weights = ctx.acquire().await.weights().await;
        assert_eq!(weights.get(&ProviderId::Gpt5), Some(0.5));
    }

    #[tokio::test]
    async fn test_dispose_then_reacquire_builds_fresh_engine() {
        let ctx = context(Arc::new(MemoryStore::default()));
        let old = ctx.acquire().await;

        ctx.dispose().await;
        assert!(!ctx.is_active().await);

        let field = FieldValue::new(FieldHandle::new("q"), "Name");
        assert_eq!(
            old.generate_and_validate(&Prompt::new("q"), &field, FieldType::Text)
                .await,
            Err(ConsensusError::Disposed)
        );

        let fresh = ctx.acquire().await;
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(!fresh.is_disposed());
        assert!(fresh
            .generate_and_validate(&Prompt::new("q"), &field, FieldType::Text)
            .await
            .unwrap()
            .has_answer());
    }
}
