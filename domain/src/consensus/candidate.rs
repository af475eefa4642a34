//! Candidate answers and round results

use crate::answer::AnswerPayload;
use crate::core::provider::ProviderId;
use serde::Serialize;

/// A validated answer from one provider, tagged with its trust weight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateAnswer {
    pub source: ProviderId,
    pub weight: f64,
    pub value: AnswerPayload,
}

impl CandidateAnswer {
    pub fn new(source: ProviderId, weight: f64, value: AnswerPayload) -> Self {
        Self {
            source,
            weight,
            value,
        }
    }
}

/// Outcome of one consensus round for a single field
///
/// `answer` is `None` when no provider produced a valid response.
/// `candidates` are the answers that fed the merge, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsensusResult {
    pub answer: Option<AnswerPayload>,
    pub candidates: Vec<CandidateAnswer>,
    /// Wall-clock latency in seconds of every provider call that returned
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub latencies: Vec<f64>,
}

impl ConsensusResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_answer(&self) -> bool {
        self.answer.is_some()
    }

    /// Providers whose answers fed the merge
    pub fn contributors(&self) -> impl Iterator<Item = &ProviderId> {
        self.candidates.iter().map(|c| &c.source)
    }

    pub fn into_answer(self) -> Option<AnswerPayload> {
        self.answer
    }
}
