use serde::{Deserialize, Serialize};
use std::fmt;

/// Export pipeline states, in order. `Cleaned` is the only success state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStage {
    RawModel,
    IntermediateFormat,
    ConvertedFormat,
    TokenizerAttached,
    Verified,
    Cleaned,
}

impl ExportStage {
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::RawModel => Some(Self::IntermediateFormat),
            Self::IntermediateFormat => Some(Self::ConvertedFormat),
            Self::ConvertedFormat => Some(Self::TokenizerAttached),
            Self::TokenizerAttached => Some(Self::Verified),
            Self::Verified => Some(Self::Cleaned),
            Self::Cleaned => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Cleaned
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RawModel => "RAW_MODEL",
            Self::IntermediateFormat => "INTERMEDIATE_FORMAT",
            Self::ConvertedFormat => "CONVERTED_FORMAT",
            Self::TokenizerAttached => "TOKENIZER_ATTACHED",
            Self::Verified => "VERIFIED",
            Self::Cleaned => "CLEANED",
        };
        f.write_str(name)
    }
}
