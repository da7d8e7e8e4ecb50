//! Domain types shared by the index, the searcher and the evaluation layer.

use serde::{Deserialize, Serialize};

/// A source document as handed to the index builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub text: String,
}

impl Document {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self { filename: filename.into(), text: text.into() }
    }
}

/// A word window of a source document; one metadata entry of the index.
///
/// A chunk's identity is its position in the flattened chunk sequence, which
/// is also its row in the embedding matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "file")]
    pub source_file: String,
    pub text: String,
}

/// One ranked result of a similarity search.
///
/// `rank` is 1-based and follows descending `score` (raw inner product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f32,
    #[serde(rename = "file")]
    pub source_file: String,
    pub text: String,
}

/// A single line of the append-only feedback log.
///
/// `observed_rank` is `None` when the expected file was not among the top `k`
/// hits at record time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub question: String,
    #[serde(rename = "answer_file", alias = "expected_file")]
    pub expected_file: String,
    pub k: usize,
    #[serde(rename = "rank", alias = "observed_rank")]
    pub observed_rank: Option<i64>,
    #[serde(default)]
    pub timestamp: i64,
}
