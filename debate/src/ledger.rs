//! Batch-level results — correctness count, unanswerable items, and
//! per-debate transcripts.
//!
//! The ledger is an owned aggregator threaded through the batch loop;
//! there is no process-wide singleton. A debate is recorded only after
//! it completes, so an aborted debate never leaves a partial entry.

use serde::{Deserialize, Serialize};

use crate::generation::ChatTurn;
use crate::orchestrator::DebateOutcome;

/// Every participant's full conversation memory for one debate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebateTranscript {
    pub topic: String,
    pub affirmative: Vec<ChatTurn>,
    pub negative: Vec<ChatTurn>,
    pub moderator: Vec<ChatTurn>,
    /// Empty unless the debate escalated.
    pub judge: Vec<ChatTurn>,
}

/// Aggregate record of debate outcomes across a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsLedger {
    /// Number of debates whose final answer contained the ground truth.
    pub correct: usize,
    /// Topics that produced no final answer (or had no parseable
    /// ground truth).
    pub unanswerable: Vec<String>,
    /// One transcript per completed debate, for later audit.
    pub transcripts: Vec<DebateTranscript>,
}

impl ResultsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed debate.
    pub fn record(&mut self, outcome: &DebateOutcome) {
        if outcome.correct {
            self.correct += 1;
        }
        if outcome.final_answer.is_none() {
            self.unanswerable.push(outcome.session.topic.clone());
        }
        self.transcripts.push(outcome.transcript.clone());
    }

    /// Record an item that could not be debated at all.
    pub fn record_unanswerable(&mut self, topic: &str) {
        self.unanswerable.push(topic.to_string());
    }

    /// Number of completed debates recorded.
    pub fn debates_recorded(&self) -> usize {
        self.transcripts.len()
    }

    /// Compact end-of-batch summary.
    pub fn summary_line(&self) -> String {
        format!(
            "{} correct / {} debates | {} unanswerable",
            self.correct,
            self.transcripts.len(),
            self.unanswerable.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DebatePhase, DebateSession};

    fn outcome(correct: bool, final_answer: Option<&str>) -> DebateOutcome {
        let mut session = DebateSession::new("q", "4", 3);
        session.final_answer = final_answer.map(str::to_string);
        session.success = final_answer.is_some();
        session.correct = correct;
        DebateOutcome {
            final_answer: final_answer.map(str::to_string),
            success: final_answer.is_some(),
            correct,
            rounds_completed: 1,
            terminal_phase: DebatePhase::Done,
            escalated: false,
            transcript: DebateTranscript {
                topic: "q".to_string(),
                ..Default::default()
            },
            session,
        }
    }

    #[test]
    fn test_record_correct_and_incorrect() {
        let mut ledger = ResultsLedger::new();
        ledger.record(&outcome(true, Some("4")));
        ledger.record(&outcome(false, Some("5")));

        assert_eq!(ledger.correct, 1);
        assert_eq!(ledger.debates_recorded(), 2);
        assert!(ledger.unanswerable.is_empty());
    }

    #[test]
    fn test_record_unanswered_debate() {
        let mut ledger = ResultsLedger::new();
        ledger.record(&outcome(false, None));

        assert_eq!(ledger.correct, 0);
        assert_eq!(ledger.unanswerable, vec!["q".to_string()]);
        // The transcript is still kept for audit.
        assert_eq!(ledger.debates_recorded(), 1);
    }

    #[test]
    fn test_record_unanswerable_item() {
        let mut ledger = ResultsLedger::new();
        ledger.record_unanswerable("bad item");
        assert_eq!(ledger.unanswerable, vec!["bad item".to_string()]);
        assert_eq!(ledger.debates_recorded(), 0);
    }

    #[test]
    fn test_summary_line() {
        let mut ledger = ResultsLedger::new();
        ledger.record(&outcome(true, Some("4")));
        assert_eq!(ledger.summary_line(), "1 correct / 1 debates | 0 unanswerable");
    }

    #[test]
    fn test_ledger_serializes() {
        let mut ledger = ResultsLedger::new();
        ledger.record(&outcome(true, Some("4")));
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("\"correct\":1"));
    }
}
