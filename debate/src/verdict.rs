//! Moderator verdict — a tagged decoded-or-raw result.
//!
//! The moderator (and the judge) are asked to reply with a structured
//! JSON object. Responses that do not decode stay available as raw
//! text instead of faulting: an undecodable verdict is simply
//! non-terminating.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// The structured verdict contract the moderator is prompted for.
///
/// All fields are defaulted so partial objects (the judge's two-key
/// reply, for instance) decode cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeratorVerdict {
    #[serde(default, rename = "Whether there is a preference")]
    pub preference: Option<String>,

    #[serde(default, rename = "Supported Side")]
    pub supported_side: Option<String>,

    #[serde(default, rename = "Reason")]
    pub reason: Option<String>,

    /// The final answer; empty until the moderator commits to one.
    /// Debaters answer numerically, so a numeric value here is
    /// stringified rather than rejected.
    #[serde(default, deserialize_with = "answer_as_text")]
    pub debate_answer: String,
}

/// Accept any JSON value for the answer field: strings pass through
/// unquoted, null stays empty, everything else uses the canonical
/// JSON rendering.
fn answer_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A moderator response: either a decoded verdict or the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Decoded(ModeratorVerdict),
    Raw(String),
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl Verdict {
    /// Parse a raw moderator response.
    ///
    /// Text that is syntactically an object (starts with `{`, ends
    /// with `}`) is strictly decoded; anything else — including objects
    /// that fail to decode — is kept as [`Verdict::Raw`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            match serde_json::from_str::<ModeratorVerdict>(trimmed) {
                Ok(verdict) => return Self::Decoded(verdict),
                Err(e) => {
                    debug!(error = %e, "moderator response looked structured but did not decode");
                }
            }
        }
        Self::Raw(raw.to_string())
    }

    /// Synthesize a terminal verdict from a consensus answer, skipping
    /// the moderator.
    pub fn consensus(answer: impl Into<String>) -> Self {
        Self::Decoded(ModeratorVerdict {
            preference: Some("Yes".to_string()),
            supported_side: None,
            reason: Some("both sides reported the same answer".to_string()),
            debate_answer: answer.into(),
        })
    }

    /// The non-empty final answer, if this verdict carries one.
    pub fn final_answer(&self) -> Option<&str> {
        match self {
            Self::Decoded(verdict) if !verdict.debate_answer.trim().is_empty() => {
                Some(verdict.debate_answer.as_str())
            }
            _ => None,
        }
    }

    /// A verdict with a non-empty final answer terminates the session.
    pub fn is_terminal(&self) -> bool {
        self.final_answer().is_some()
    }
}
