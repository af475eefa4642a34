//! Consensus engine
//!
//! Runs one consensus round per field: fans the prompt out to the weighted
//! providers in parallel, keeps the answers that validate, and merges them by
//! weight. No more calls are started than answers can still be used.

use super::pool::ProviderPool;
use crate::ports::provider::{ProviderClient, ProviderError};
use docfiller_domain::util::preview;
use docfiller_domain::{
    AnswerValidator, CandidateAnswer, ConsensusResult, FieldType, FieldValue, MAX_RESPONSES,
    Prompt, ProviderId, RawAnswer, WeightTable, merge,
};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Provider position, latency in seconds and outcome of one call
type Invocation = (usize, f64, Result<RawAnswer, ProviderError>);

/// Errors that end a round without a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("Consensus engine has been disposed")]
    Disposed,

    #[error("Consensus round cancelled")]
    Cancelled,
}

/// Weighted multi-provider answer engine
///
/// Owns the provider pool and weight table of one host context. Provider
/// failures and invalid answers are contained within a round; only disposal
/// and cancellation surface as errors.
pub struct ConsensusEngine {
    pool: ProviderPool,
    weights: RwLock<WeightTable>,
    validator: AnswerValidator,
    max_responses: usize,
    disposed: AtomicBool,
}

impl ConsensusEngine {
    /// Create an engine; `weights` are normalized
    pub fn new(pool: ProviderPool, mut weights: WeightTable) -> Self {
        weights.normalize();
        Self {
            pool,
            weights: RwLock::new(weights),
            validator: AnswerValidator::new(),
            max_responses: MAX_RESPONSES,
            disposed: AtomicBool::new(false),
        }
    }

    /// Override the per-round cap on collected answers
    pub fn with_max_responses(mut self, max_responses: usize) -> Self {
        self.max_responses = max_responses.max(1);
        self
    }

    pub async fn weights(&self) -> WeightTable {
        self.weights.read().await.clone()
    }

    /// Set weights for the given providers and renormalize
    pub async fn update_weights(&self, weights: impl IntoIterator<Item = (ProviderId, f64)>) {
        let mut table = self.weights.write().await;
        table.set(weights);
        table.normalize();
    }

    /// Providers with a weight above zero, in configuration order
    pub async fn active_providers(&self) -> Vec<ProviderId> {
        self.weights
            .read()
            .await
            .active()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn pool(&self) -> &ProviderPool {
        &self.pool
    }

    /// First active provider whose client can be constructed
    pub async fn lead_client(&self) -> Option<Arc<dyn ProviderClient>> {
        for provider in self.active_providers().await {
            match self.pool.get_or_create(&provider).await {
                Ok(client) => return Some(client),
                Err(e) => warn!("Provider {} unavailable: {}", provider, e),
            }
        }
        None
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Clear pool and weights; the engine rejects every later round
    pub async fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.pool.clear().await;
        self.weights.write().await.clear();
        debug!("Consensus engine disposed");
    }

    /// Run one consensus round for a field.
    ///
    /// The result has no answer when no provider produced a valid one.
    pub async fn generate_and_validate(
        &self,
        prompt: &Prompt,
        field: &FieldValue,
        field_type: FieldType,
    ) -> Result<ConsensusResult, ConsensusError> {
        self.run_round(prompt, field, field_type, None).await
    }

    /// Like [`generate_and_validate`](Self::generate_and_validate), but
    /// abandons the round when `token` is cancelled
    pub async fn generate_and_validate_with_cancel(
        &self,
        prompt: &Prompt,
        field: &FieldValue,
        field_type: FieldType,
        token: &CancellationToken,
    ) -> Result<ConsensusResult, ConsensusError> {
        self.run_round(prompt, field, field_type, Some(token)).await
    }

    async fn run_round(
        &self,
        prompt: &Prompt,
        field: &FieldValue,
        field_type: FieldType,
        token: Option<&CancellationToken>,
    ) -> Result<ConsensusResult, ConsensusError> {
        if self.is_disposed() {
            return Err(ConsensusError::Disposed);
        }
        if token.is_some_and(|t| t.is_cancelled()) {
            return Err(ConsensusError::Cancelled);
        }

        let active: Vec<(ProviderId, f64)> = self
            .weights
            .read()
            .await
            .active()
            .map(|(p, w)| (p.clone(), w))
            .collect();

        if active.is_empty() {
            warn!("No provider has a positive weight");
            return Ok(ConsensusResult::empty());
        }

        info!(
            "Consensus round for {} field '{}' across {} providers",
            field_type,
            preview(&field.title, 60),
            active.len()
        );

        // At most `max_responses` calls are in flight; a call that ends
        // without an accepted answer makes room for the next provider
        let mut pending = 0..active.len();
        let mut join_set = JoinSet::new();
        while join_set.len() < self.max_responses {
            if !self
                .spawn_next(&mut join_set, &active, &mut pending, prompt, field_type)
                .await
            {
                break;
            }
        }

        // Tagged with the provider's position so the merge sees
        // configuration order regardless of completion order
        let mut accepted: Vec<(usize, CandidateAnswer)> = Vec::new();
        let mut latencies = Vec::new();

        loop {
            let result = if let Some(token) = token {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        join_set.abort_all();
                        info!("Consensus round cancelled");
                        return Err(ConsensusError::Cancelled);
                    }
                    result = join_set.join_next() => result,
                }
            } else {
                join_set.join_next().await
            };

            let Some(result) = result else {
                break;
            };

            let answered = match result {
                Ok((index, elapsed, Ok(raw))) => {
                    let (provider, weight) = &active[index];
                    latencies.push(elapsed);

                    if raw.is_null() {
                        debug!("Provider {} returned no answer", provider);
                        false
                    } else if let Some(value) = self.validator.accept(field_type, field, &raw) {
                        debug!("Provider {} answer accepted", provider);
                        accepted.push((index, CandidateAnswer::new(provider.clone(), *weight, value)));
                        true
                    } else {
                        debug!(
                            "Provider {} answer rejected for {} field: {}",
                            provider,
                            field_type,
                            preview(&raw.value().to_string(), 120)
                        );
                        false
                    }
                }
                Ok((index, _, Err(e))) => {
                    warn!("Provider {} failed: {}", active[index].0, e);
                    false
                }
                Err(e) => {
                    warn!("Provider task failed: {}", e);
                    false
                }
            };

            if accepted.len() >= self.max_responses {
                debug!(
                    "Collected {} answers, abandoning {} in-flight providers",
                    accepted.len(),
                    join_set.len()
                );
                join_set.abort_all();
                break;
            }

            if !answered {
                self.spawn_next(&mut join_set, &active, &mut pending, prompt, field_type)
                    .await;
            }
        }

        accepted.sort_by_key(|(index, _)| *index);
        let candidates: Vec<CandidateAnswer> = accepted.into_iter().map(|(_, c)| c).collect();
        let answer = merge(field_type, field, &candidates);

        info!(
            "Consensus round finished: {} of {} providers contributed, {}",
            candidates.len(),
            active.len(),
            if answer.is_some() { "answered" } else { "no answer" }
        );

        Ok(ConsensusResult {
            answer,
            candidates,
            latencies,
        })
    }

    /// Start the next pending provider whose client can be constructed.
    ///
    /// Returns `false` once every provider has been started.
    async fn spawn_next(
        &self,
        join_set: &mut JoinSet<Invocation>,
        active: &[(ProviderId, f64)],
        pending: &mut Range<usize>,
        prompt: &Prompt,
        field_type: FieldType,
    ) -> bool {
        for index in pending.by_ref() {
            let provider = &active[index].0;
            let client = match self.pool.get_or_create(provider).await {
                Ok(client) => client,
                Err(e) => {
                    warn!("Provider {} unavailable: {}", provider, e);
                    continue;
                }
            };
            let prompt = prompt.clone();

            join_set.spawn(async move {
                let started = Instant::now();
                let result = client.invoke(&prompt, field_type).await;
                (index, started.elapsed().as_secs_f64(), result)
            });
            return true;
        }
        false
    }
}
