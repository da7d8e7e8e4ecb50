//! Append-only JSONL feedback log.
//!
//! One record per line:
//! `{"question": .., "answer_file": .., "k": .., "rank": <int|null>, "timestamp": ..}`.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use helpdesk_core::error::{Error, Result};
use helpdesk_core::types::{FeedbackRecord, SearchHit};

/// Rank of the first hit whose file is `expected_file`.
pub fn observed_rank(hits: &[SearchHit], expected_file: &str) -> Option<i64> {
    hits.iter().find(|h| h.source_file == expected_file).and_then(|h| i64::try_from(h.rank).ok())
}

/// A record stamped with the current Unix time.
pub fn stamped_record(question: &str, expected_file: &str, k: usize, observed_rank: Option<i64>) -> FeedbackRecord {
    FeedbackRecord {
        question: question.to_string(),
        expected_file: expected_file.to_string(),
        k,
        observed_rank,
        timestamp: chrono::Utc::now().timestamp(),
    }
}

/// Ranks read back from the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackScan {
    pub ranks: Vec<Option<i64>>,
    /// Lines that were not JSON objects; excluded from `ranks`.
    pub skipped: usize,
}

pub struct FeedbackStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Append one record as a single line. Appends through the same store never interleave.
    pub fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)?;
        debug!(path = %self.path.display(), rank = ?record.observed_rank, "feedback appended");
        Ok(())
    }

    /// Read every rank in the log.
    ///
    /// A missing log is `NoFeedback`. Blank lines are ignored; lines that are
    /// not JSON objects are skipped and counted. A `rank` that is null,
    /// missing, non-integer or not positive reads as `None`.
    pub fn scan(&self) -> Result<FeedbackScan> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NoFeedback { path: self.path.clone() });
            }
            Err(e) => return Err(e.into()),
        };
        let mut scan = FeedbackScan::default();
        for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            let text = String::from_utf8_lossy(&line);
            if text.trim().is_empty() { continue; }
            match parse_rank(&text) {
                Ok(rank) => scan.ranks.push(rank),
                Err(reason) => {
                    let err = Error::MalformedFeedbackRecord { line: idx + 1, reason };
                    warn!(error = %err, path = %self.path.display(), "skipping feedback line");
                    scan.skipped += 1;
                }
            }
        }
        Ok(scan)
    }
}

fn parse_rank(line: &str) -> std::result::Result<Option<i64>, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let obj = value.as_object().ok_or_else(|| "not a JSON object".to_string())?;
    Ok(obj.get("rank").and_then(Value::as_i64).filter(|r| *r > 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_parsing_follows_log_rules() {
        assert_eq!(parse_rank(r#"{"rank": 2}"#), Ok(Some(2)));
        assert_eq!(parse_rank(r#"{"rank": null}"#), Ok(None));
        assert_eq!(parse_rank(r#"{"question": "q"}"#), Ok(None));
        assert_eq!(parse_rank(r#"{"rank": 0}"#), Ok(None));
        assert_eq!(parse_rank(r#"{"rank": -3}"#), Ok(None));
        assert_eq!(parse_rank(r#"{"rank": 2.5}"#), Ok(None));
        assert_eq!(parse_rank(r#"{"rank": "1"}"#), Ok(None));
        assert!(parse_rank("[1, 2]").is_err());
        assert!(parse_rank(r#"{"rank": 1"#).is_err());
    }

    #[test]
    fn observed_rank_takes_first_matching_hit() {
        let hit = |rank, file: &str| SearchHit { rank, score: 0.0, source_file: file.into(), text: String::new() };
        let hits = vec![hit(1, "a.txt"), hit(2, "b.txt"), hit(3, "b.txt")];
        assert_eq!(observed_rank(&hits, "b.txt"), Some(2));
        assert_eq!(observed_rank(&hits, "c.txt"), None);
    }
}
