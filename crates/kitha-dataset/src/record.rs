use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum character count for a raw record to be kept at ingestion.
pub const MIN_RECORD_CHARS: usize = 20;

/// Canonical two-valued classification target.
///
/// Persisted as the integer codes used by the training and serving side:
/// `0` for human-written text, `1` for AI-generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Human,
    Ai,
}

impl Label {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Human => 0,
            Self::Ai => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.index() as u8
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Human),
            1 => Ok(Self::Ai),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Ai => f.write_str("ai"),
        }
    }
}

/// One labeled text sample with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub text: String,
    pub label: Label,
    /// Provenance only; never consulted when balancing or splitting.
    pub source: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextType {
    OriginalShort,
    Chunked,
}

/// A bounded-length derivative of a [`Record`], the unit persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedRecord {
    pub text: String,
    pub label: Label,
    pub source: String,
    pub category: String,
    pub text_type: TextType,
}

impl SegmentedRecord {
    /// Build a segment that inherits label and provenance from `origin`.
    #[must_use]
    pub fn derive(origin: &Record, text: String, text_type: TextType) -> Self {
        Self {
            text,
            label: origin.label,
            source: origin.source.clone(),
            category: origin.category.clone(),
            text_type,
        }
    }
}

/// Anything carrying a canonical label.
pub trait Labeled {
    fn label(&self) -> Label;
}

impl Labeled for Record {
    fn label(&self) -> Label {
        self.label
    }
}

impl Labeled for SegmentedRecord {
    fn label(&self) -> Label {
        self.label
    }
}

/// Length in Unicode scalar values, the unit every length rule is stated in.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
