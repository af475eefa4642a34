//! Form-filling run phases

use serde::{Deserialize, Serialize};

/// Phase of a form-filling run
///
/// ```text
/// Idle -> Initializing -> ProfileResolution -> PerQuestionLoop -> Finalizing -> Idle
///              |                                                     ^
///              +----------------- configuration error ---------------+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    /// Engine or single provider is prepared and configuration checked
    Initializing,
    /// Magic profiles get their system prompt generated
    ProfileResolution,
    /// Fields are processed one by one, in document order
    PerQuestionLoop,
    /// Metrics are flushed
    Finalizing,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Initializing => "initializing",
            RunPhase::ProfileResolution => "profile_resolution",
            RunPhase::PerQuestionLoop => "per_question_loop",
            RunPhase::Finalizing => "finalizing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RunPhase::Idle => "Idle",
            RunPhase::Initializing => "Initializing",
            RunPhase::ProfileResolution => "Profile Resolution",
            RunPhase::PerQuestionLoop => "Filling Fields",
            RunPhase::Finalizing => "Finalizing",
        }
    }

    /// Whether the run may move from `self` to `next`.
    ///
    /// Every phase after Idle may jump to Finalizing, which is how
    /// configuration errors and cancellation end a run.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (RunPhase::Idle, RunPhase::Initializing)
                | (RunPhase::Initializing, RunPhase::ProfileResolution)
                | (RunPhase::ProfileResolution, RunPhase::PerQuestionLoop)
                | (
                    RunPhase::Initializing | RunPhase::ProfileResolution | RunPhase::PerQuestionLoop,
                    RunPhase::Finalizing
                )
                | (RunPhase::Finalizing, RunPhase::Idle)
        )
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
