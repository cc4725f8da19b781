//! Debate session state machine — phases, transitions, per-round answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::verdict::Verdict;

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebatePhase {
    /// Round 1: both sides state opinions, moderator gives a first verdict.
    Opening,
    /// Rounds 2..=max_round: rebuttal exchanges.
    Rebuttal,
    /// A terminal verdict arrived before rounds ran out.
    ConsensusReached,
    /// Rounds exhausted with no terminal verdict — judge adjudicates.
    Escalated,
    /// Outcome recorded.
    Done,
}

impl DebatePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Valid transitions from this phase. `Rebuttal → Rebuttal` is the
    /// round-advancing self-transition.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Opening => &[Self::Rebuttal, Self::ConsensusReached, Self::Escalated],
            Self::Rebuttal => &[Self::Rebuttal, Self::ConsensusReached, Self::Escalated],
            Self::ConsensusReached => &[Self::Done],
            Self::Escalated => &[Self::Done],
            Self::Done => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Rebuttal => write!(f, "rebuttal"),
            Self::ConsensusReached => write!(f, "consensus_reached"),
            Self::Escalated => write!(f, "escalated"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} -> {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// A debate session: the question, the protocol state, and the latest
/// answers from both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    /// Unique session identifier.
    pub id: String,
    /// The question being debated.
    pub topic: String,
    /// Ground-truth answer text used for correctness scoring.
    pub ground_truth: String,
    /// Current phase.
    pub phase: DebatePhase,
    /// Current round, 1-indexed; the opening exchange is round 1.
    pub current_round: u32,
    /// Maximum rounds allowed. Invariant: `current_round <= max_round`.
    pub max_round: u32,
    /// The affirmative's opening answer, kept for reporting.
    pub base_answer: String,
    /// Latest raw answers.
    pub aff_raw: String,
    pub neg_raw: String,
    /// Latest extracted answer fragments (may lag one round for the
    /// negative side — see the orchestrator).
    pub aff_fragment: Option<String>,
    pub neg_fragment: Option<String>,
    /// The moderator's current verdict.
    pub verdict: Verdict,
    /// Final answer, once a terminal verdict exists.
    pub final_answer: Option<String>,
    /// Whether the debate produced a final answer.
    pub success: bool,
    /// Whether the final answer contained the ground truth.
    pub correct: bool,
    /// Transition history.
    pub transitions: Vec<PhaseTransition>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    /// Create a new session in the `Opening` phase, round 1.
    pub fn new(topic: &str, ground_truth: &str, max_round: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            ground_truth: ground_truth.to_string(),
            phase: DebatePhase::Opening,
            current_round: 1,
            max_round,
            base_answer: String::new(),
            aff_raw: String::new(),
            neg_raw: String::new(),
            aff_fragment: None,
            neg_fragment: None,
            verdict: Verdict::default(),
            final_answer: None,
            success: false,
            correct: false,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    ///
    /// Entering `Rebuttal` advances the round counter and is rejected
    /// once the round budget is spent.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        if to == DebatePhase::Rebuttal && self.current_round >= self.max_round {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!("round budget exhausted ({}/{})", self.current_round, self.max_round),
            });
        }

        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        if to == DebatePhase::Rebuttal {
            self.current_round += 1;
        }

        Ok(())
    }

    /// Whether the debate has ended.
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | success={} correct={}",
            self.phase, self.current_round, self.max_round, self.success, self.correct
        )
    }
}
