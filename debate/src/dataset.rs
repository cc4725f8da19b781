//! JSONL dataset loading for batch evaluation.
//!
//! Each line is an object with a `question` and an `answer` field; the
//! answer field carries worked reasoning followed by a `#### ` marker
//! and the final ground-truth value.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Marker separating reasoning from the final value in an answer field.
pub const ANSWER_DELIMITER: &str = "#### ";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One question with its reference answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetItem {
    pub question: String,
    pub answer: String,
}

impl DatasetItem {
    /// The ground-truth value: everything after the `#### ` marker,
    /// trimmed. `None` when the marker is absent, which makes the item
    /// unanswerable rather than an error.
    pub fn ground_truth(&self) -> Option<&str> {
        self.answer
            .split_once(ANSWER_DELIMITER)
            .map(|(_, truth)| truth.trim())
    }
}

/// Load every record from a JSONL file. Blank lines are skipped; a
/// malformed line is an error carrying its 1-based line number.
pub fn load_jsonl(path: &Path) -> Result<Vec<DatasetItem>, DatasetError> {
    let contents = std::fs::read_to_string(path)?;
    let mut items = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item: DatasetItem =
            serde_json::from_str(line).map_err(|source| DatasetError::Parse {
                line: idx + 1,
                source,
            })?;
        items.push(item);
    }
    debug!(count = items.len(), path = %path.display(), "dataset loaded");
    Ok(items)
}

/// Select the evaluation window: `number` items starting at `start`.
/// `number == 0` means everything from `start` to the end; a window
/// past the end is empty.
pub fn slice(items: &[DatasetItem], start: usize, number: usize) -> &[DatasetItem] {
    if start >= items.len() {
        return &[];
    }
    let rest = &items[start..];
    if number == 0 || number >= rest.len() {
        rest
    } else {
        &rest[..number]
    }
}
