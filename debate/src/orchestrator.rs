//! Debate orchestrator — drives the opening exchange, rebuttal rounds,
//! consensus short-circuit, and judge escalation.
//!
//! # Protocol
//!
//! ```text
//! Opening ──► [consensus / terminal verdict?] ──► ConsensusReached ──► Done
//!    │                  │ no                            ▲
//!    │                  ▼                               │
//!    │             Rebuttal(n) ────────────────────────-┘
//!    │                  │ rounds exhausted, no verdict
//!    ▼                  ▼
//!    └────────────► Escalated (judge adjudicates) ────► Done
//! ```
//!
//! Each round the affirmative and negative sides answer once and the
//! moderator issues a verdict. A verdict carrying a non-empty final
//! answer ends the debate; two sides independently reporting the same
//! extracted answer synthesizes such a verdict without the moderator.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extract::{answer_text, decode_answer, extract_fragment};
use crate::generation::{GenerationBackend, GenerationError};
use crate::ledger::DebateTranscript;
use crate::participant::{DebateRole, Participant};
use crate::session::{DebatePhase, DebateSession};
use crate::templates::{
    fill, PromptTemplates, AFF_ANS_PLACEHOLDER, NEG_ANS_PLACEHOLDER, OPPO_ANS_PLACEHOLDER,
    ROUND_PLACEHOLDER,
};
use crate::verdict::Verdict;

/// Upper bound on rounds, set by the moderator's ordinal vocabulary.
pub const MAX_SUPPORTED_ROUNDS: u32 = 10;

const ROUND_ORDINALS: [&str; MAX_SUPPORTED_ROUNDS as usize] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

fn round_ordinal(round: u32) -> &'static str {
    ROUND_ORDINALS[(round.clamp(1, MAX_SUPPORTED_ROUNDS) - 1) as usize]
}

/// Configuration for one debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum rounds including the opening exchange; clamped to
    /// [`MAX_SUPPORTED_ROUNDS`].
    pub max_round: u32,
    /// Rate-limit delay before each generation call.
    pub sleep: Duration,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            top_p: 0.0,
            max_round: 3,
            sleep: Duration::ZERO,
        }
    }
}

impl DebateConfig {
    fn clamped(mut self) -> Self {
        if self.max_round == 0 {
            warn!("max_round 0 is meaningless, raising to 1");
            self.max_round = 1;
        }
        if self.max_round > MAX_SUPPORTED_ROUNDS {
            warn!(
                requested = self.max_round,
                "max_round exceeds the supported bound, clamping to {}", MAX_SUPPORTED_ROUNDS
            );
            self.max_round = MAX_SUPPORTED_ROUNDS;
        }
        self
    }
}

/// Error from the debate orchestrator. Fatal to the debate it occurred
/// in; batch callers contain it per item.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("generation failed for {role}: {source}")]
    Generation {
        role: DebateRole,
        #[source]
        source: GenerationError,
    },

    #[error("invalid state transition: {0}")]
    Transition(String),

    #[error("cannot escalate: {side} side has no post-opening reply recorded")]
    EscalationPrecondition { side: DebateRole },
}

/// Outcome of a completed debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    /// The final verdict answer, if any side of the protocol produced one.
    pub final_answer: Option<String>,
    /// Whether the debate produced a final answer.
    pub success: bool,
    /// Whether the ground truth was a substring of the final answer.
    pub correct: bool,
    /// Rounds executed, opening included.
    pub rounds_completed: u32,
    /// Phase the debate terminated in (always `Done` after `run`).
    pub terminal_phase: DebatePhase,
    /// Whether the judge had to adjudicate.
    pub escalated: bool,
    /// Every participant's full memory.
    pub transcript: DebateTranscript,
    /// The session snapshot at completion.
    pub session: DebateSession,
}

impl DebateOutcome {
    pub fn summary_line(&self) -> String {
        let status = if !self.success {
            "UNANSWERED"
        } else if self.escalated {
            "ADJUDICATED"
        } else {
            "DECIDED"
        };
        format!(
            "[{}] {} rounds | answer={} correct={}",
            status,
            self.rounds_completed,
            self.final_answer.as_deref().unwrap_or("-"),
            self.correct
        )
    }
}

/// Drives one debate end-to-end over a generation backend.
pub struct DebateOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    templates: PromptTemplates,
    config: DebateConfig,
    session: DebateSession,
    affirmative: Participant,
    negative: Participant,
    moderator: Participant,
    judge: Option<Participant>,
}

impl DebateOrchestrator {
    /// Create an orchestrator for one question. The judge participant
    /// is created lazily, only on escalation.
    pub fn new(
        topic: &str,
        ground_truth: &str,
        templates: PromptTemplates,
        config: DebateConfig,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        let config = config.clamped();
        let templates = templates.for_topic(topic);
        let session = DebateSession::new(topic, ground_truth, config.max_round);

        let participant = |role| {
            Participant::new(
                role,
                config.model.clone(),
                config.temperature,
                config.top_p,
                config.sleep,
            )
        };

        Self {
            backend,
            templates,
            session,
            affirmative: participant(DebateRole::Affirmative),
            negative: participant(DebateRole::Negative),
            moderator: participant(DebateRole::Moderator),
            judge: None,
            config,
        }
    }

    /// Run the debate to completion.
    pub async fn run(mut self) -> Result<DebateOutcome, DebateError> {
        self.opening().await?;

        // The loop body runs at most max_round - 1 times after the
        // opening exchange.
        for round in 2..=self.config.max_round {
            if let Some(shared) = self.consensus_answer() {
                let answer = answer_text(&shared);
                info!(round = self.session.current_round, answer = %answer, "sides reached consensus");
                self.session.verdict = Verdict::consensus(answer);
            }

            if self.session.verdict.is_terminal() {
                self.transition(DebatePhase::ConsensusReached, "terminal verdict")?;
                break;
            }

            self.transition(DebatePhase::Rebuttal, "no terminal verdict yet")?;
            info!(round, "debate round");
            self.rebuttal_exchange(round).await?;
        }

        if self.session.verdict.is_terminal() {
            self.conclude()?;
        } else {
            self.escalate().await?;
        }

        Ok(self.into_outcome())
    }

    async fn ask(&self, participant: &Participant) -> Result<String, DebateError> {
        participant
            .ask(self.backend.as_ref())
            .await
            .map_err(|source| DebateError::Generation {
                role: participant.role,
                source,
            })
    }

    /// Round 1: set instructions, both sides state opinions, moderator
    /// gives a first verdict.
    async fn opening(&mut self) -> Result<(), DebateError> {
        self.affirmative
            .set_instructions(self.templates.player_instructions());
        self.negative
            .set_instructions(self.templates.player_instructions());
        self.moderator
            .set_instructions(self.templates.moderator_meta_prompt.clone());

        info!(round = 1, topic = %self.session.topic, "debate round");

        self.affirmative
            .add_event(self.templates.affirmative_prompt.clone());
        let aff_raw = self.ask(&self.affirmative).await?;
        self.session.aff_fragment = extract_fragment(&aff_raw).map(str::to_string);
        self.affirmative.add_memory(aff_raw.clone());
        self.session.base_answer = aff_raw.clone();
        self.session.aff_raw = aff_raw;

        self.negative.add_event(fill(
            &self.templates.negative_prompt,
            &[(AFF_ANS_PLACEHOLDER, &self.session.aff_raw)],
        ));
        let neg_raw = self.ask(&self.negative).await?;
        self.session.neg_fragment = extract_fragment(&neg_raw).map(str::to_string);
        self.negative.add_memory(neg_raw.clone());
        self.session.neg_raw = neg_raw;

        debug!(
            aff = ?self.session.aff_fragment,
            neg = ?self.session.neg_fragment,
            "opening fragments"
        );

        self.moderator.add_event(fill(
            &self.templates.moderator_prompt,
            &[
                (AFF_ANS_PLACEHOLDER, &self.session.aff_raw),
                (NEG_ANS_PLACEHOLDER, &self.session.neg_raw),
                (ROUND_PLACEHOLDER, round_ordinal(1)),
            ],
        ));
        let mod_raw = self.ask(&self.moderator).await?;
        self.moderator.add_memory(mod_raw.clone());
        self.session.verdict = Verdict::parse(&mod_raw);

        Ok(())
    }

    /// One rebuttal round: both sides answer the opponent's prior
    /// position, then the moderator re-evaluates.
    async fn rebuttal_exchange(&mut self, round: u32) -> Result<(), DebateError> {
        self.affirmative.add_event(fill(
            &self.templates.debate_prompt,
            &[(OPPO_ANS_PLACEHOLDER, &self.session.neg_raw)],
        ));
        let aff_raw = self.ask(&self.affirmative).await?;
        self.session.aff_fragment = extract_fragment(&aff_raw).map(str::to_string);
        self.affirmative.add_memory(aff_raw.clone());
        self.session.aff_raw = aff_raw;

        self.negative.add_event(fill(
            &self.templates.debate_prompt,
            &[(OPPO_ANS_PLACEHOLDER, &self.session.aff_raw)],
        ));
        // Behavior-bearing ordering: the negative fragment fed to the
        // next consensus check comes from its PREVIOUS answer, taken
        // before the re-ask overwrites it.
        self.session.neg_fragment = extract_fragment(&self.session.neg_raw).map(str::to_string);
        let neg_raw = self.ask(&self.negative).await?;
        self.negative.add_memory(neg_raw.clone());
        self.session.neg_raw = neg_raw;

        self.moderator.add_event(fill(
            &self.templates.moderator_prompt,
            &[
                (AFF_ANS_PLACEHOLDER, &self.session.aff_raw),
                (NEG_ANS_PLACEHOLDER, &self.session.neg_raw),
                (ROUND_PLACEHOLDER, round_ordinal(round)),
            ],
        ));
        let mod_raw = self.ask(&self.moderator).await?;
        self.moderator.add_memory(mod_raw.clone());
        self.session.verdict = Verdict::parse(&mod_raw);

        Ok(())
    }

    /// Decode both sides' latest fragments; equal answer values mean
    /// consensus. Decode failure on either side is "no consensus this
    /// round", never fatal.
    fn consensus_answer(&self) -> Option<Value> {
        let aff = decode_answer(self.session.aff_fragment.as_deref()?)?;
        let neg = decode_answer(self.session.neg_fragment.as_deref()?)?;
        if aff == neg {
            Some(aff)
        } else {
            debug!(aff = %aff, neg = %neg, "sides disagree");
            None
        }
    }

    /// Terminal-verdict path: record the answer and score correctness.
    fn conclude(&mut self) -> Result<(), DebateError> {
        if self.session.phase != DebatePhase::ConsensusReached {
            // Terminal verdict arrived in the final rebuttal round, so
            // the loop exited by count rather than by break.
            self.transition(DebatePhase::ConsensusReached, "terminal verdict")?;
        }

        if let Some(answer) = self.session.verdict.final_answer() {
            let answer = answer.to_string();
            self.session.correct = answer.contains(&self.session.ground_truth);
            self.session.final_answer = Some(answer);
            self.session.success = true;
        }

        if self.session.correct {
            info!(
                answer = self.session.final_answer.as_deref().unwrap_or(""),
                truth = %self.session.ground_truth,
                "debate answer is correct"
            );
        } else {
            info!(
                answer = self.session.final_answer.as_deref().unwrap_or(""),
                truth = %self.session.ground_truth,
                "debate answer does not match ground truth"
            );
        }

        self.transition(DebatePhase::Done, "outcome recorded")
    }

    /// Fallback adjudication: a fourth participant with the moderator's
    /// instructions collects both sides' post-opening positions, then
    /// selects a single final answer.
    async fn escalate(&mut self) -> Result<(), DebateError> {
        self.transition(DebatePhase::Escalated, "rounds exhausted without a verdict")?;
        info!(rounds = self.session.current_round, "escalating to judge");

        // Precondition: each side must have a post-opening exchange
        // recorded, otherwise there are no candidates to adjudicate.
        let aff_reply = self
            .affirmative
            .nth_reply(1)
            .ok_or(DebateError::EscalationPrecondition {
                side: DebateRole::Affirmative,
            })?
            .to_string();
        let neg_reply = self
            .negative
            .nth_reply(1)
            .ok_or(DebateError::EscalationPrecondition {
                side: DebateRole::Negative,
            })?
            .to_string();

        let mut judge = Participant::new(
            DebateRole::Judge,
            self.config.model.clone(),
            self.config.temperature,
            self.config.top_p,
            self.config.sleep,
        );
        judge.set_instructions(self.templates.moderator_meta_prompt.clone());

        // First ask: collect answer candidates.
        judge.add_event(fill(
            &self.templates.judge_prompt_last1,
            &[
                (AFF_ANS_PLACEHOLDER, &aff_reply),
                (NEG_ANS_PLACEHOLDER, &neg_reply),
            ],
        ));
        let candidates = self.ask(&judge).await?;
        judge.add_memory(candidates);

        // Second ask: select one.
        judge.add_event(self.templates.judge_prompt_last2.clone());
        let decision = self.ask(&judge).await?;
        judge.add_memory(decision.clone());

        let verdict = Verdict::parse(&decision);
        if let Some(answer) = verdict.final_answer() {
            let answer = answer.to_string();
            if !self.session.correct {
                self.session.correct = answer.contains(&self.session.ground_truth);
            }
            self.session.final_answer = Some(answer);
            self.session.success = true;
        } else {
            warn!("judge produced no decodable final answer");
        }
        self.session.verdict = verdict;
        self.judge = Some(judge);

        self.transition(DebatePhase::Done, "adjudication recorded")
    }

    fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), DebateError> {
        self.session
            .transition(to, reason)
            .map_err(|e| DebateError::Transition(e.to_string()))
    }

    fn into_outcome(self) -> DebateOutcome {
        let transcript = DebateTranscript {
            topic: self.session.topic.clone(),
            affirmative: self.affirmative.memory().to_vec(),
            negative: self.negative.memory().to_vec(),
            moderator: self.moderator.memory().to_vec(),
            judge: self
                .judge
                .as_ref()
                .map(|j| j.memory().to_vec())
                .unwrap_or_default(),
        };

        let escalated = self
            .session
            .transitions
            .iter()
            .any(|t| t.to == DebatePhase::Escalated);

        DebateOutcome {
            final_answer: self.session.final_answer.clone(),
            success: self.session.success,
            correct: self.session.correct,
            rounds_completed: self.session.current_round,
            terminal_phase: self.session.phase,
            escalated,
            transcript,
            session: self.session,
        }
    }
}
