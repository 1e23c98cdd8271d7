//! Row-to-record normalization.
//!
//! Rows that fail the length filter or carry an unmappable label are dropped
//! silently; only the count survives, in the assembly report.

use crate::record::{char_len, Label, Record, MIN_RECORD_CHARS};
use crate::source::{RawRow, RecordLayout, SourceSpec};
use serde_json::Value;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    min_chars: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { min_chars: MIN_RECORD_CHARS }
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    #[must_use]
    pub fn normalize(&self, spec: &SourceSpec, row: &RawRow) -> Normalized {
        let mut out = Normalized::default();

        match &spec.layout {
            RecordLayout::Labeled { text_field, label_fields, source_field } => {
                let raw_label = label_fields.iter().find_map(|f| row.get(f));
                let Some(label) = spec.labels.coerce(raw_label) else {
                    out.rejected += 1;
                    return out;
                };
                let source = match source_field {
                    Some(field) => format!("{}_{}", spec.id, provenance_value(row.get(field))),
                    None => spec.id.clone(),
                };
                match row.get(text_field).and_then(Value::as_str) {
                    Some(text) => self.push(&mut out, spec, text, label, &source),
                    None => out.rejected += 1,
                }
            }
            RecordLayout::Paired { entries } => {
                for entry in entries {
                    let Some(value) = entry.fields.iter().find_map(|f| non_empty(row.get(f))) else {
                        continue;
                    };
                    match value {
                        Value::String(text) => self.push(&mut out, spec, text, entry.label, &spec.id),
                        Value::Array(items) => {
                            for item in items {
                                match item.as_str() {
                                    Some(text) => {
                                        self.push(&mut out, spec, text, entry.label, &spec.id);
                                    }
                                    None => out.rejected += 1,
                                }
                            }
                        }
                        _ => out.rejected += 1,
                    }
                }
            }
        }

        out
    }

    fn push(&self, out: &mut Normalized, spec: &SourceSpec, text: &str, label: Label, source: &str) {
        let text = text.trim();
        if text.is_empty() || char_len(text) < self.min_chars {
            out.rejected += 1;
            return;
        }
        out.records.push(Record {
            text: text.to_string(),
            label,
            source: source.to_string(),
            category: spec.category.clone(),
        });
    }
}

/// First usable value: not null, not an empty string, not an empty list.
fn non_empty(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    })
}

fn provenance_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(Value::String(_)) => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::catalog::{builtin_sources, tweepfake_csv};
    use serde_json::json;
    use std::path::PathBuf;

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    fn spec(id: &str) -> SourceSpec {
        builtin_sources().into_iter().find(|s| s.id == id).unwrap()
    }

    const LONG_HUMAN: &str = "  I think the answer depends on the jurisdiction you live in.  ";
    const LONG_AI: &str = "As an AI language model, I can explain the general principles involved.";

    #[test]
    fn test_paired_layout_expands_answer_lists() {
        let out = Normalizer::default().normalize(
            &spec("hc3"),
            &row(json!({
                "question": "q",
                "human_answers": [LONG_HUMAN, "too short"],
                "chatgpt_answers": [LONG_AI],
            })),
        );

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.rejected, 1);
        assert_eq!(out.records[0].label, Label::Human);
        assert_eq!(out.records[0].text, LONG_HUMAN.trim());
        assert_eq!(out.records[1].label, Label::Ai);
        assert_eq!(out.records[1].category, "qa");
        assert_eq!(out.records[1].source, "hc3");
    }

    #[test]
    fn test_paired_layout_uses_first_non_empty_alternative() {
        let out = Normalizer::default().normalize(
            &spec("chatgpt_research"),
            &row(json!({"human_text": "", "Human": LONG_HUMAN, "chatgpt_text": LONG_AI})),
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].text, LONG_HUMAN.trim());
    }

    #[test]
    fn test_labeled_layout_prefixes_provenance_column() {
        let pile = spec("pile");
        let out = Normalizer::default()
            .normalize(&pile, &row(json!({"text": LONG_AI, "source": "ai", "generated": "gpt"})));
        assert_eq!(out.records[0].source, "pile_ai");
        assert_eq!(out.records[0].label, Label::Ai);

        let out = Normalizer::default().normalize(&pile, &row(json!({"text": LONG_HUMAN, "label": 0})));
        assert_eq!(out.records[0].source, "pile_unknown");
        assert_eq!(out.records[0].label, Label::Human);
    }

    #[test]
    fn test_unmappable_label_is_rejected_silently() {
        let tweets = tweepfake_csv(PathBuf::from("t.csv"));
        let out = Normalizer::default()
            .normalize(&tweets, &row(json!({"text": LONG_HUMAN, "account.type": "unknown"})));
        assert!(out.records.is_empty());
        assert_eq!(out.rejected, 1);
    }

    #[test]
    fn test_length_filter_boundary() {
        let pile = spec("pile");
        let exactly_twenty = "a".repeat(MIN_RECORD_CHARS);
        let out = Normalizer::default().normalize(&pile, &row(json!({"text": exactly_twenty})));
        assert_eq!(out.records.len(), 1);

        let nineteen = format!("   {}   ", "a".repeat(MIN_RECORD_CHARS - 1));
        let out = Normalizer::default().normalize(&pile, &row(json!({"text": nineteen})));
        assert!(out.records.is_empty());
        assert_eq!(out.rejected, 1);
    }
}
