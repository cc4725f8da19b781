//! Prompt template set with `##placeholder##` substitution.
//!
//! Templates carry the debate's conversational contract: debaters must
//! embed a `{"answer": ...}` object, the moderator must reply with the
//! structured verdict JSON. The built-in defaults can be overridden
//! from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Recognized placeholders.
pub const TOPIC_PLACEHOLDER: &str = "##debate_topic##";
pub const AFF_ANS_PLACEHOLDER: &str = "##aff_ans##";
pub const NEG_ANS_PLACEHOLDER: &str = "##neg_ans##";
pub const OPPO_ANS_PLACEHOLDER: &str = "##oppo_ans##";
pub const ROUND_PLACEHOLDER: &str = "##round##";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("template file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("mega prompt file has no \"megaprompt\" key")]
    MissingMegaprompt,
}

/// Substitute placeholder/value pairs into a template.
pub fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .fold(template.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}

/// The named prompt templates driving one debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Shared system framing for both debaters.
    pub player_meta_prompt: String,
    /// System framing for the moderator (and the judge on escalation).
    pub moderator_meta_prompt: String,
    /// Opening ask for the affirmative side.
    pub affirmative_prompt: String,
    /// Opening ask for the negative side, conditioned on `##aff_ans##`.
    pub negative_prompt: String,
    /// Per-round moderator ask, conditioned on both answers and `##round##`.
    pub moderator_prompt: String,
    /// Rebuttal ask, conditioned on the opponent's `##oppo_ans##`.
    pub debate_prompt: String,
    /// First judge ask: collect answer candidates.
    pub judge_prompt_last1: String,
    /// Second judge ask: select the final answer.
    pub judge_prompt_last2: String,
    /// Optional extension appended to the debater meta prompt.
    pub megaprompt: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            player_meta_prompt: "You are a debater. Hello and welcome to the debate \
                competition. It's not necessary to fully agree with each other's \
                perspectives, as the objective is to find the correct answer. The debate \
                topic is stated as follows: ##debate_topic##"
                .to_string(),
            moderator_meta_prompt: "You are a moderator. There will be two debaters \
                involved in a debate competition. They will present their answers and \
                discuss their perspectives on the following topic: ##debate_topic##. At \
                the end of each round you will evaluate both sides' answers and decide \
                whether a correct answer has emerged."
                .to_string(),
            affirmative_prompt: "You are the affirmative side. Please state your answer \
                to the debate topic, explaining your reasoning step by step. Embed the \
                final answer in json format with the key \"answer\", for example \
                {\"answer\": 42}."
                .to_string(),
            negative_prompt: "##aff_ans##\n\nYou disagree with my answer. Provide your \
                own answer and your reasons. Embed the final answer in json format with \
                the key \"answer\"."
                .to_string(),
            moderator_prompt: "Now the ##round## round of debate for both sides has \
                ended.\n\nAffirmative side arguing: ##aff_ans##\n\nNegative side \
                arguing: ##neg_ans##\n\nYou, as the moderator, will evaluate both \
                sides' answers and decide whether there is a preference for a side. If \
                there is, the debate is over: summarize your reasons and give the final \
                answer you think is correct. Reply strictly in json format: {\"Whether \
                there is a preference\": \"Yes or No\", \"Supported Side\": \
                \"Affirmative or Negative\", \"Reason\": \"\", \"debate_answer\": \
                \"\"}. Leave debate_answer empty if there is no preference yet."
                .to_string(),
            debate_prompt: "##oppo_ans##\n\nDo you agree with my perspective? Please \
                express your opinion and embed your final answer in json format with \
                the key \"answer\"."
                .to_string(),
            judge_prompt_last1: "Affirmative side arguing: ##aff_ans##\n\nNegative \
                side arguing: ##neg_ans##\n\nNow, what answer candidates do we have? \
                Present them without reasons."
                .to_string(),
            judge_prompt_last2: "Therefore, the debate topic is: ##debate_topic##. \
                Please summarize your reasons and give the final answer you think is \
                correct to end the debate. Reply strictly in json format: {\"Reason\": \
                \"\", \"debate_answer\": \"\"}."
                .to_string(),
            megaprompt: String::new(),
        }
    }
}

impl PromptTemplates {
    /// Load a template set from a JSON file. Missing keys keep their
    /// built-in defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load the mega instruction block from a `{"megaprompt": "..."}` file.
    pub fn load_megaprompt(path: &Path) -> Result<String, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        value
            .get("megaprompt")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(TemplateError::MissingMegaprompt)
    }

    /// Attach a mega extension to the debater meta prompt.
    pub fn with_megaprompt(mut self, mega: impl Into<String>) -> Self {
        self.megaprompt = mega.into();
        self
    }

    /// Substitute the debate topic into the templates that reference it:
    /// both meta prompts, the affirmative opening, and the second judge
    /// prompt.
    pub fn for_topic(&self, topic: &str) -> Self {
        let pairs = &[(TOPIC_PLACEHOLDER, topic)];
        let mut templates = self.clone();
        templates.player_meta_prompt = fill(&self.player_meta_prompt, pairs);
        templates.moderator_meta_prompt = fill(&self.moderator_meta_prompt, pairs);
        templates.affirmative_prompt = fill(&self.affirmative_prompt, pairs);
        templates.judge_prompt_last2 = fill(&self.judge_prompt_last2, pairs);
        templates
    }

    /// Debater system framing: the player meta prompt, with the mega
    /// extension appended when present.
    pub fn player_instructions(&self) -> String {
        if self.megaprompt.is_empty() {
            self.player_meta_prompt.clone()
        } else {
            format!("{} {}", self.player_meta_prompt, self.megaprompt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fill_single_placeholder() {
        let out = fill("topic: ##debate_topic##", &[(TOPIC_PLACEHOLDER, "2+2")]);
        assert_eq!(out, "topic: 2+2");
    }

    #[test]
    fn test_fill_multiple_placeholders() {
        let out = fill(
            "aff: ##aff_ans## neg: ##neg_ans## round: ##round##",
            &[
                (AFF_ANS_PLACEHOLDER, "4"),
                (NEG_ANS_PLACEHOLDER, "5"),
                (ROUND_PLACEHOLDER, "second"),
            ],
        );
        assert_eq!(out, "aff: 4 neg: 5 round: second");
    }

    #[test]
    fn test_fill_no_placeholder_is_identity() {
        assert_eq!(fill("plain text", &[(TOPIC_PLACEHOLDER, "x")]), "plain text");
    }

    #[test]
    fn test_for_topic_substitutes_meta_prompts() {
        let templates = PromptTemplates::default().for_topic("What is 2+2?");
        assert!(templates.player_meta_prompt.contains("What is 2+2?"));
        assert!(templates.moderator_meta_prompt.contains("What is 2+2?"));
        assert!(templates.judge_prompt_last2.contains("What is 2+2?"));
        assert!(!templates.player_meta_prompt.contains(TOPIC_PLACEHOLDER));
        // Round-facing templates keep their answer placeholders.
        assert!(templates.moderator_prompt.contains(AFF_ANS_PLACEHOLDER));
        assert!(templates.debate_prompt.contains(OPPO_ANS_PLACEHOLDER));
    }

    #[test]
    fn test_player_instructions_with_mega() {
        let plain = PromptTemplates::default();
        assert_eq!(plain.player_instructions(), plain.player_meta_prompt);

        let extended = PromptTemplates::default().with_megaprompt("Always show working.");
        let instructions = extended.player_instructions();
        assert!(instructions.ends_with("Always show working."));
        assert!(instructions.starts_with(&extended.player_meta_prompt));
    }

    #[test]
    fn test_from_json_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"affirmative_prompt\": \"custom opening\"}}").unwrap();

        let templates = PromptTemplates::from_json_file(file.path()).unwrap();
        assert_eq!(templates.affirmative_prompt, "custom opening");
        // Untouched keys fall back to defaults.
        assert_eq!(
            templates.moderator_prompt,
            PromptTemplates::default().moderator_prompt
        );
    }

    #[test]
    fn test_load_megaprompt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"megaprompt\": \"be rigorous\"}}").unwrap();
        assert_eq!(
            PromptTemplates::load_megaprompt(file.path()).unwrap(),
            "be rigorous"
        );

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "{{}}").unwrap();
        let err = PromptTemplates::load_megaprompt(empty.path()).unwrap_err();
        assert!(matches!(err, TemplateError::MissingMegaprompt));
    }
}
