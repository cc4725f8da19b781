//! Multi-Agent Debate Library
//!
//! This library runs structured debates between LLM personas to answer
//! questions and scores the outcomes against ground truth:
//! - Affirmative and negative debaters argue over bounded rounds
//! - A moderator evaluates each round and can end the debate early
//! - Matching extracted answers short-circuit to consensus
//! - A judge adjudicates when the rounds run out undecided
//!
//! # Modules
//!
//! - [`extract`]: answer-marker scanning and tolerant JSON decoding
//! - [`generation`]: chat-completion backend abstraction and OpenAI client
//! - [`participant`]: debate roles and per-persona conversation memory
//! - [`templates`]: prompt template set with placeholder substitution
//! - [`verdict`]: moderator/judge verdict parsing
//! - [`session`]: debate phase machine and per-debate state
//! - [`orchestrator`]: the round-by-round debate driver
//! - [`dataset`]: JSONL question/answer loading
//! - [`runner`]: batch evaluation over a dataset window
//! - [`ledger`]: batch-level results aggregation

#![allow(clippy::uninlined_format_args)]

pub mod dataset;
pub mod extract;
pub mod generation;
pub mod ledger;
pub mod orchestrator;
pub mod participant;
pub mod runner;
pub mod session;
pub mod templates;
pub mod verdict;

// Re-export the types a batch caller needs
pub use dataset::{load_jsonl, slice, DatasetError, DatasetItem, ANSWER_DELIMITER};
pub use generation::{
    ChatTurn, CompletionRequest, GenerationBackend, GenerationError, OpenAiBackend, TurnRole,
};
pub use ledger::{DebateTranscript, ResultsLedger};
pub use orchestrator::{
    DebateConfig, DebateError, DebateOrchestrator, DebateOutcome, MAX_SUPPORTED_ROUNDS,
};
pub use participant::{DebateRole, Participant};
pub use runner::{BatchRunner, RunnerConfig};
pub use session::{DebatePhase, DebateSession, PhaseTransition, TransitionError};
pub use templates::{PromptTemplates, TemplateError};
pub use verdict::{ModeratorVerdict, Verdict};
