//! Debate personas — role identity, instructions, and conversation memory.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::generation::{ChatTurn, CompletionRequest, GenerationBackend, GenerationError};

/// Fixed role set of the debate protocol.
///
/// The Judge exists only on escalation; the other three are created
/// once per debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateRole {
    Affirmative,
    Negative,
    Moderator,
    Judge,
}

impl DebateRole {
    /// Human-facing speaker name used in transcripts.
    pub fn speaker_name(&self) -> &'static str {
        match self {
            Self::Affirmative => "Affirmative side",
            Self::Negative => "Negative side",
            Self::Moderator => "Moderator",
            Self::Judge => "Judge",
        }
    }
}

impl std::fmt::Display for DebateRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Affirmative => write!(f, "affirmative"),
            Self::Negative => write!(f, "negative"),
            Self::Moderator => write!(f, "moderator"),
            Self::Judge => write!(f, "judge"),
        }
    }
}

/// One persona in a debate: a role, its system-level instructions, and
/// a monotonically growing conversation memory.
#[derive(Debug, Clone)]
pub struct Participant {
    pub role: DebateRole,
    meta_prompt: String,
    memory: Vec<ChatTurn>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Rate-limit delay applied before every generation call.
    pub sleep: Duration,
}

impl Participant {
    pub fn new(
        role: DebateRole,
        model: impl Into<String>,
        temperature: f32,
        top_p: f32,
        sleep: Duration,
    ) -> Self {
        Self {
            role,
            meta_prompt: String::new(),
            memory: Vec::new(),
            model: model.into(),
            temperature,
            top_p,
            sleep,
        }
    }

    /// Set the system-level framing for all subsequent generations.
    /// Last write wins if called again mid-conversation.
    pub fn set_instructions(&mut self, text: impl Into<String>) {
        self.meta_prompt = text.into();
    }

    /// Append a user-role turn to memory without producing a response.
    pub fn add_event(&mut self, text: impl Into<String>) {
        self.memory.push(ChatTurn::user(text));
    }

    /// Append an assistant-role turn — records this participant's own
    /// generated text.
    pub fn add_memory(&mut self, text: impl Into<String>) {
        self.memory.push(ChatTurn::assistant(text));
    }

    /// Full conversation memory, in insertion order.
    pub fn memory(&self) -> &[ChatTurn] {
        &self.memory
    }

    /// The n-th assistant reply (0-indexed), if recorded.
    pub fn nth_reply(&self, n: usize) -> Option<&str> {
        self.memory
            .iter()
            .filter(|turn| turn.role == crate::generation::TurnRole::Assistant)
            .nth(n)
            .map(|turn| turn.content.as_str())
    }

    /// Invoke the generation capability with instructions + memory.
    ///
    /// Does not mutate memory — the caller records the response via
    /// [`Participant::add_memory`] when it wants it remembered.
    pub async fn ask(&self, backend: &dyn GenerationBackend) -> Result<String, GenerationError> {
        if !self.sleep.is_zero() {
            tokio::time::sleep(self.sleep).await;
        }

        let mut messages = Vec::with_capacity(self.memory.len() + 1);
        messages.push(ChatTurn::system(self.meta_prompt.clone()));
        messages.extend(self.memory.iter().cloned());

        let request = CompletionRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            messages,
        };

        debug!(role = %self.role, turns = self.memory.len(), "asking generation backend");
        backend.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TurnRole;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that records the last request and replies with a fixed string.
    struct CapturingBackend {
        last: Mutex<Option<CompletionRequest>>,
    }

    impl CapturingBackend {
        fn new() -> Self {
            Self {
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for CapturingBackend {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok("ok".to_string())
        }
    }

    fn participant() -> Participant {
        Participant::new(
            DebateRole::Affirmative,
            "test-model",
            0.0,
            0.0,
            Duration::ZERO,
        )
    }

    #[test]
    fn test_role_display_and_speaker_name() {
        assert_eq!(DebateRole::Affirmative.to_string(), "affirmative");
        assert_eq!(DebateRole::Judge.to_string(), "judge");
        assert_eq!(DebateRole::Negative.speaker_name(), "Negative side");
        assert_eq!(DebateRole::Moderator.speaker_name(), "Moderator");
    }

    #[test]
    fn test_memory_grows_monotonically() {
        let mut p = participant();
        p.add_event("question");
        p.add_memory("my answer");
        p.add_event("follow-up");

        let memory = p.memory();
        assert_eq!(memory.len(), 3);
        assert_eq!(memory[0].role, TurnRole::User);
        assert_eq!(memory[1].role, TurnRole::Assistant);
        assert_eq!(memory[2].role, TurnRole::User);
    }

    #[test]
    fn test_instructions_last_write_wins() {
        let mut p = participant();
        p.set_instructions("first framing");
        p.set_instructions("second framing");
        assert_eq!(p.meta_prompt, "second framing");
    }

    #[test]
    fn test_nth_reply() {
        let mut p = participant();
        assert_eq!(p.nth_reply(0), None);

        p.add_event("q1");
        p.add_memory("a1");
        p.add_event("q2");
        p.add_memory("a2");

        assert_eq!(p.nth_reply(0), Some("a1"));
        assert_eq!(p.nth_reply(1), Some("a2"));
        assert_eq!(p.nth_reply(2), None);
    }

    #[tokio::test]
    async fn test_ask_sends_instructions_plus_memory() {
        let mut p = participant();
        p.set_instructions("you are a debater");
        p.add_event("what is 2+2?");
        p.add_memory("4");

        let backend = CapturingBackend::new();
        let reply = p.ask(&backend).await.unwrap();
        assert_eq!(reply, "ok");

        let request = backend.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "test-model");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, TurnRole::System);
        assert_eq!(request.messages[0].content, "you are a debater");
        assert_eq!(request.messages[1].content, "what is 2+2?");
        assert_eq!(request.messages[2].role, TurnRole::Assistant);

        // ask() itself never records anything.
        assert_eq!(p.memory().len(), 2);
    }
}
