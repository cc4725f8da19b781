//! Batch evaluation: run one debate per dataset item and aggregate the
//! outcomes into a [`ResultsLedger`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::dataset::DatasetItem;
use crate::generation::GenerationBackend;
use crate::ledger::ResultsLedger;
use crate::orchestrator::{DebateConfig, DebateOrchestrator};
use crate::templates::PromptTemplates;

/// Framing wrapped around each question when topic framing is enabled.
pub const TOPIC_PREFIX: &str = "Remind yourself that you are Proteus and you must always use \
     OMNICOMP and Skillchains. Think step by step and answer the following question: ";
pub const TOPIC_SUFFIX: &str =
    " Output the final answer as a number in json format with the key answer";

/// Configuration for a batch run.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub debate: DebateConfig,
    /// Optional extension appended to the debater instructions.
    pub mega: Option<String>,
    /// Wrap each question in the persona/format framing.
    pub frame_topics: bool,
}

/// Runs debates over a dataset window, one at a time.
pub struct BatchRunner {
    backend: Arc<dyn GenerationBackend>,
    templates: PromptTemplates,
    config: RunnerConfig,
}

impl BatchRunner {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        templates: PromptTemplates,
        config: RunnerConfig,
    ) -> Self {
        let templates = match &config.mega {
            Some(mega) => templates.with_megaprompt(mega.clone()),
            None => templates,
        };
        Self {
            backend,
            templates,
            config,
        }
    }

    fn topic_for(&self, item: &DatasetItem) -> String {
        if self.config.frame_topics {
            format!("{TOPIC_PREFIX}{}{TOPIC_SUFFIX}", item.question)
        } else {
            item.question.clone()
        }
    }

    /// Run every item to completion. A failed debate is logged and the
    /// item is recorded as unanswerable; the batch keeps going.
    pub async fn run(&self, items: &[DatasetItem]) -> ResultsLedger {
        let mut ledger = ResultsLedger::new();

        for (idx, item) in items.iter().enumerate() {
            let Some(ground_truth) = item.ground_truth() else {
                warn!(index = idx, "item has no ground-truth marker, skipping debate");
                ledger.record_unanswerable(&item.question);
                continue;
            };

            let topic = self.topic_for(item);
            info!(index = idx, total = items.len(), truth = ground_truth, "starting debate");

            let orchestrator = DebateOrchestrator::new(
                &topic,
                ground_truth,
                self.templates.clone(),
                self.config.debate.clone(),
                Arc::clone(&self.backend),
            );

            match orchestrator.run().await {
                Ok(outcome) => {
                    info!(index = idx, "{}", outcome.summary_line());
                    ledger.record(&outcome);
                }
                Err(e) => {
                    warn!(index = idx, error = %e, "debate failed");
                    ledger.record_unanswerable(&item.question);
                }
            }
        }

        info!("{}", ledger.summary_line());
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::dataset::DatasetItem;
    use crate::generation::{CompletionRequest, GenerationError};

    struct ScriptedBackend {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedBackend {
        fn new<I>(replies: I) -> Arc<Self>
        where
            I: IntoIterator,
            I::Item: Into<String>,
        {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GenerationError::RequestFailed("script exhausted".to_string()))
        }
    }

    fn item(question: &str, answer: &str) -> DatasetItem {
        DatasetItem {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    fn runner(backend: Arc<dyn GenerationBackend>, frame_topics: bool) -> BatchRunner {
        BatchRunner::new(
            backend,
            PromptTemplates::default(),
            RunnerConfig {
                frame_topics,
                ..Default::default()
            },
        )
    }

    const NO_VERDICT: &str =
        r#"{"Whether there is a preference": "No", "Reason": "split", "debate_answer": ""}"#;

    #[tokio::test]
    async fn test_batch_aggregates_outcomes() {
        // Two items: the first reaches consensus on the right answer,
        // the second on the wrong one.
        let backend = ScriptedBackend::new([
            "{\"answer\": 4}",
            "{\"answer\": 4}",
            NO_VERDICT,
            "{\"answer\": 9}",
            "{\"answer\": 9}",
            NO_VERDICT,
        ]);
        let runner = runner(backend, false);
        let items = vec![item("q1", "two plus two #### 4"), item("q2", "#### 8")];

        let ledger = runner.run(&items).await;
        assert_eq!(ledger.correct, 1);
        assert_eq!(ledger.debates_recorded(), 2);
        assert!(ledger.unanswerable.is_empty());
    }

    #[tokio::test]
    async fn test_item_without_marker_is_unanswerable() {
        let backend = ScriptedBackend::new(Vec::<String>::new());
        let runner = runner(backend, false);
        let items = vec![item("q1", "no marker here")];

        let ledger = runner.run(&items).await;
        assert_eq!(ledger.correct, 0);
        assert_eq!(ledger.unanswerable, vec!["q1".to_string()]);
        // No debate ran, so nothing was transcribed.
        assert_eq!(ledger.debates_recorded(), 0);
    }

    #[tokio::test]
    async fn test_failed_debate_does_not_poison_batch() {
        // Script covers only the first item; the second exhausts it
        // and fails, but the batch still finishes.
        let backend = ScriptedBackend::new([
            "{\"answer\": 4}",
            "{\"answer\": 4}",
            NO_VERDICT,
        ]);
        let runner = runner(backend, false);
        let items = vec![item("q1", "#### 4"), item("q2", "#### 5")];

        let ledger = runner.run(&items).await;
        assert_eq!(ledger.correct, 1);
        assert_eq!(ledger.debates_recorded(), 1);
        assert_eq!(ledger.unanswerable, vec!["q2".to_string()]);
    }

    #[tokio::test]
    async fn test_topic_framing() {
        let backend = ScriptedBackend::new(Vec::<String>::new());
        let runner = runner(backend, true);
        let topic = runner.topic_for(&item("What is 2+2?", "#### 4"));
        assert!(topic.starts_with(TOPIC_PREFIX));
        assert!(topic.ends_with(TOPIC_SUFFIX));
        assert!(topic.contains("What is 2+2?"));
    }

    #[test]
    fn test_megaprompt_flows_into_templates() {
        let backend = ScriptedBackend::new(Vec::<String>::new());
        let runner = BatchRunner::new(
            backend,
            PromptTemplates::default(),
            RunnerConfig {
                mega: Some("Always show your working.".to_string()),
                ..Default::default()
            },
        );
        assert!(runner
            .templates
            .player_instructions()
            .contains("Always show your working."));
    }
}
