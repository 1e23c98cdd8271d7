//! Built-in corpus catalog.

use super::{Backend, PairedField, RecordLayout, SourceSpec};
use crate::labels::LabelMap;
use crate::record::Label;
use std::path::PathBuf;

/// Group shared by the supplemental detector corpora.
pub const EXTRA_GROUP: &str = "extra";

fn hub(dataset: &str, config: Option<&str>) -> Backend {
    Backend::Hub {
        dataset: dataset.to_string(),
        config: config.map(str::to_string),
        split: "train".to_string(),
    }
}

/// The default sources, in fetch order.
#[must_use]
pub fn builtin_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec {
            id: "hc3".to_string(),
            category: "qa".to_string(),
            backend: hub("Hello-SimpleAI/HC3", Some("all")),
            layout: RecordLayout::Paired {
                entries: vec![
                    PairedField::new(&["human_answers"], Label::Human),
                    PairedField::new(&["chatgpt_answers"], Label::Ai),
                ],
            },
            labels: LabelMap::default(),
            group: None,
            supplemental: false,
        },
        SourceSpec {
            id: "pile".to_string(),
            category: "essay".to_string(),
            backend: hub("artem9k/ai-text-detection-pile", None),
            layout: RecordLayout::Labeled {
                text_field: "text".to_string(),
                label_fields: vec!["generated".to_string(), "label".to_string()],
                source_field: Some("source".to_string()),
            },
            labels: LabelMap::default(),
            group: None,
            supplemental: false,
        },
        SourceSpec {
            id: "chatgpt_detector".to_string(),
            category: "mixed".to_string(),
            backend: hub("Hello-SimpleAI/chatgpt-detector-roberta", None),
            layout: RecordLayout::Labeled {
                text_field: "text".to_string(),
                label_fields: vec!["label".to_string()],
                source_field: None,
            },
            labels: LabelMap::default(),
            group: Some(EXTRA_GROUP.to_string()),
            supplemental: false,
        },
        SourceSpec {
            id: "chatgpt_research".to_string(),
            category: "mixed".to_string(),
            backend: hub("NicolaiSivesworried/ChatGPT-Research-Dataset", None),
            layout: RecordLayout::Paired {
                entries: vec![
                    PairedField::new(&["human_text", "Human"], Label::Human),
                    PairedField::new(&["ai_text", "ChatGPT", "chatgpt_text"], Label::Ai),
                ],
            },
            labels: LabelMap::default(),
            group: Some(EXTRA_GROUP.to_string()),
            supplemental: true,
        },
        SourceSpec {
            id: "gpt_wiki".to_string(),
            category: "wiki".to_string(),
            backend: hub("aadityaubhat/GPT-wiki-intro", None),
            layout: RecordLayout::Paired {
                entries: vec![
                    PairedField::new(&["wiki_intro"], Label::Human),
                    PairedField::new(&["generated_intro", "gpt_intro"], Label::Ai),
                ],
            },
            labels: LabelMap::default(),
            group: Some(EXTRA_GROUP.to_string()),
            supplemental: true,
        },
    ]
}

/// TweepFake tweets exported to CSV (`text` + `account.type` of `human`/`bot`).
#[must_use]
pub fn tweepfake_csv(path: PathBuf) -> SourceSpec {
    SourceSpec {
        id: "tweepfake".to_string(),
        category: "tweet".to_string(),
        backend: Backend::Csv { path },
        layout: RecordLayout::Labeled {
            text_field: "text".to_string(),
            label_fields: vec!["account.type".to_string(), "label".to_string()],
            source_field: None,
        },
        labels: LabelMap::account_type(),
        group: None,
        supplemental: false,
    }
}
