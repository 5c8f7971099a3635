//! Per-record generation outcomes.

use std::fmt;

use crate::record::{ProductRecord, fields};

/// Outcome tag written to the `generation_status` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Success,
    /// The remote call failed; the message is recorded inline.
    Error(String),
    /// Already complete in a previous run.
    Skipped,
}

impl GenerationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error(message) => write!(f, "error: {message}"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Generated text for one record, tied to the record's identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub key: String,
    pub text: String,
    pub status: GenerationStatus,
}

impl GenerationResult {
    pub fn success(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            status: GenerationStatus::Success,
        }
    }

    /// Failed generation: empty text, message kept in the status.
    pub fn failure(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: String::new(),
            status: GenerationStatus::Error(message.into()),
        }
    }

    pub fn skipped(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: String::new(),
            status: GenerationStatus::Skipped,
        }
    }

    /// Copy of `record` with the two synthetic output columns filled in.
    pub fn augment(&self, record: &ProductRecord) -> ProductRecord {
        let mut out = record.clone();
        out.set(fields::NEW_DESCRIPTION, self.text.as_str());
        out.set(fields::GENERATION_STATUS, self.status.to_string());
        out
    }
}
