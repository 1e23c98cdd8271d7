//! Declarative per-source label coercion.
//!
//! Every upstream corpus encodes its target differently (category strings,
//! boolean flags, integer codes). A [`LabelMap`] states how one source's raw
//! values map onto [`Label`]; it is validated once when the source is
//! registered, never per record.

use crate::error::{DatasetError, DatasetResult};
use crate::record::Label;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The lowercased value must equal a listed string.
    #[default]
    Exact,
    /// The lowercased value must contain a listed string.
    Contains,
}

/// What to do with a value no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unmatched {
    #[default]
    Human,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMap {
    pub ai_strings: Vec<String>,
    pub human_strings: Vec<String>,
    pub match_mode: MatchMode,
    pub ai_integers: Vec<i64>,
    pub true_is_ai: bool,
    pub unmatched: Unmatched,
}

impl Default for LabelMap {
    /// `"ai"`, `"generated"`, `"gpt"`, `"1"`, `"true"`, `true` and `1` mean AI;
    /// everything else is human.
    fn default() -> Self {
        Self {
            ai_strings: ["ai", "generated", "gpt", "1", "true"].map(String::from).to_vec(),
            human_strings: Vec::new(),
            match_mode: MatchMode::Exact,
            ai_integers: vec![1],
            true_is_ai: true,
            unmatched: Unmatched::Human,
        }
    }
}

impl LabelMap {
    /// Substring rules: `human` first, then `bot`/`ai`/`fake`; anything else is dropped.
    #[must_use]
    pub fn account_type() -> Self {
        Self {
            ai_strings: ["bot", "ai", "fake"].map(String::from).to_vec(),
            human_strings: vec!["human".to_string()],
            match_mode: MatchMode::Contains,
            ai_integers: vec![1],
            true_is_ai: true,
            unmatched: Unmatched::Skip,
        }
    }

    pub fn validate(&self, source_id: &str) -> DatasetResult<()> {
        let invalid = |reason: String| DatasetError::InvalidLabelMap {
            source_id: source_id.to_string(),
            reason,
        };

        if self.ai_strings.is_empty() && self.ai_integers.is_empty() && !self.true_is_ai {
            return Err(invalid("no rule maps any value to the AI label".to_string()));
        }
        for needle in self.ai_strings.iter().chain(&self.human_strings) {
            if needle.trim().is_empty() {
                return Err(invalid("label strings must not be empty".to_string()));
            }
        }
        for ai in &self.ai_strings {
            if self.human_strings.iter().any(|h| h.eq_ignore_ascii_case(ai)) {
                return Err(invalid(format!("'{ai}' is listed under both labels")));
            }
        }
        Ok(())
    }

    /// Coerce a raw value. `None` means the record should be dropped.
    #[must_use]
    pub fn coerce(&self, raw: Option<&Value>) -> Option<Label> {
        let matched = match raw {
            Some(Value::String(s)) => self.coerce_str(s),
            Some(Value::Bool(b)) => Some(if *b == self.true_is_ai { Label::Ai } else { Label::Human }),
            Some(Value::Number(n)) => integral(n).map(|i| {
                if self.ai_integers.contains(&i) { Label::Ai } else { Label::Human }
            }),
            _ => None,
        };

        match matched {
            Some(label) => Some(label),
            None => match self.unmatched {
                Unmatched::Human => Some(Label::Human),
                Unmatched::Skip => None,
            },
        }
    }

    fn coerce_str(&self, raw: &str) -> Option<Label> {
        let value = raw.trim().to_lowercase();
        let hit = |needle: &String| {
            let needle = needle.to_lowercase();
            match self.match_mode {
                MatchMode::Exact => value == needle,
                MatchMode::Contains => value.contains(&needle),
            }
        };

        if self.human_strings.iter().any(hit) {
            Some(Label::Human)
        } else if self.ai_strings.iter().any(hit) {
            Some(Label::Ai)
        } else if self.match_mode == MatchMode::Exact && self.human_strings.is_empty() {
            // Without explicit human values every non-AI string is human.
            Some(Label::Human)
        } else {
            None
        }
    }
}

/// Integer codes, also written as whole floats (`1.0`).
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(f))
            .map(|f| f as i64)
    })
}
