use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A recoverable per-record failure: the record was left out of the write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub message: String,
    pub payload: Value,
}

impl RecordError {
    pub fn new(message: impl Into<String>, payload: Value) -> Self {
        Self {
            message: message.into(),
            payload,
        }
    }
}

/// Result of one bulk call. Records carry external identifiers only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub errors: Vec<RecordError>,
    pub records: Vec<Value>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What an upsert does when a candidate's natural key matches a live row.
/// Soft-deleted matches are always resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveConflictPolicy {
    /// Leave the live row untouched and report the record as a duplicate.
    #[default]
    Reject,
    /// Overwrite the live row's non-key columns.
    Merge,
}
