//! Tokenization into fixed-length `[CLS] … [SEP]` id sequences.
//!
//! The tokenizer is BERT-flavoured: text is lowercased and split on
//! whitespace and punctuation, then each word is matched greedily against
//! the vocabulary (longest prefix first, `##` marking word continuations).

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::warn;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

/// Default sequence length, `[CLS]` and `[SEP]` included.
pub const DEFAULT_MAX_LENGTH: usize = 128;

const CONTINUATION: &str = "##";
const MAX_WORD_CHARS: usize = 100;

/// A padded/truncated id sequence and its attention mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl Encoding {
    /// Ids of the attended positions.
    pub fn attended(&self) -> impl Iterator<Item = u32> + '_ {
        self.input_ids
            .iter()
            .zip(&self.attention_mask)
            .filter(|(_, mask)| **mask == 1)
            .map(|(id, _)| *id)
    }
}

pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Encoding;
    fn vocab_size(&self) -> usize;
    fn max_length(&self) -> usize;
}

/// `special_tokens_map.json` in a raw model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokensMap {
    pub pad_token: String,
    pub unk_token: String,
    pub cls_token: String,
    pub sep_token: String,
}

impl Default for SpecialTokensMap {
    fn default() -> Self {
        Self {
            pad_token: PAD_TOKEN.to_string(),
            unk_token: UNK_TOKEN.to_string(),
            cls_token: CLS_TOKEN.to_string(),
            sep_token: SEP_TOKEN.to_string(),
        }
    }
}

/// `tokenizer_config.json` shipped in an export bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub max_length: usize,
    pub pad_token_id: u32,
    pub cls_token_id: u32,
    pub sep_token_id: u32,
    pub unk_token_id: u32,
    pub vocab_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpecialIds {
    pad: u32,
    unk: u32,
    cls: u32,
    sep: u32,
}

#[derive(Debug, Clone)]
pub struct WordPieceTokenizer {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
    special: SpecialIds,
    max_length: usize,
}

impl WordPieceTokenizer {
    /// Build from an ordered vocabulary (id = position).
    pub fn new(tokens: Vec<String>, special: &SpecialTokensMap, max_length: usize) -> ModelResult<Self> {
        if max_length < 2 {
            return Err(ModelError::Tokenizer(format!("max_length {max_length} leaves no room for [CLS]/[SEP]")));
        }
        let mut ids = HashMap::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let id = u32::try_from(i).map_err(|_| ModelError::Tokenizer("vocabulary too large".to_string()))?;
            if token.is_empty() {
                continue;
            }
            if let Some(first) = ids.get(token) {
                warn!(token = %token, first = *first, duplicate = id, "Duplicate vocabulary token, keeping first id");
                continue;
            }
            ids.insert(token.clone(), id);
        }

        let lookup = |token: &str| {
            ids.get(token)
                .copied()
                .ok_or_else(|| ModelError::Tokenizer(format!("special token '{token}' missing from vocabulary")))
        };
        let special = SpecialIds {
            pad: lookup(&special.pad_token)?,
            unk: lookup(&special.unk_token)?,
            cls: lookup(&special.cls_token)?,
            sep: lookup(&special.sep_token)?,
        };

        Ok(Self { tokens, ids, special, max_length })
    }

    /// Read `vocab.txt` (one token per line) and its special-token map.
    pub fn from_vocab_file(vocab: &Path, special: &SpecialTokensMap, max_length: usize) -> ModelResult<Self> {
        let contents = std::fs::read_to_string(vocab)?;
        let tokens = contents.lines().map(str::to_string).collect();
        Self::new(tokens, special, max_length)
    }

    /// Rebuild from a bundle's `vocab.json` (token → id) and `tokenizer_config.json`.
    ///
    /// Ids left unused by duplicate tokens in the source vocabulary stay as
    /// empty slots so every other id keeps its position.
    pub fn from_bundle_files(vocab_json: &Path, config_json: &Path) -> ModelResult<Self> {
        let vocab: BTreeMap<String, u32> = serde_json::from_str(&std::fs::read_to_string(vocab_json)?)?;
        let config: TokenizerConfig = serde_json::from_str(&std::fs::read_to_string(config_json)?)?;

        let size = vocab.values().max().map_or(0, |max| *max as usize + 1).max(config.vocab_size);
        let mut tokens = vec![String::new(); size];
        for (token, id) in vocab {
            let slot = tokens
                .get_mut(id as usize)
                .ok_or_else(|| ModelError::Tokenizer(format!("vocab id {id} out of range")))?;
            *slot = token;
        }
        let name = |id: u32| -> ModelResult<String> {
            tokens
                .get(id as usize)
                .cloned()
                .ok_or_else(|| ModelError::Tokenizer(format!("special token id {id} out of range")))
        };
        let special = SpecialTokensMap {
            pad_token: name(config.pad_token_id)?,
            unk_token: name(config.unk_token_id)?,
            cls_token: name(config.cls_token_id)?,
            sep_token: name(config.sep_token_id)?,
        };
        Self::new(tokens, &special, config.max_length)
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[must_use]
    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    #[must_use]
    pub fn is_special(&self, id: u32) -> bool {
        let s = self.special;
        id == s.pad || id == s.unk || id == s.cls || id == s.sep
    }

    #[must_use]
    pub fn config(&self) -> TokenizerConfig {
        TokenizerConfig {
            max_length: self.max_length,
            pad_token_id: self.special.pad,
            cls_token_id: self.special.cls,
            sep_token_id: self.special.sep,
            unk_token_id: self.special.unk,
            vocab_size: self.tokens.len(),
        }
    }

    /// Token → id map as written to `vocab.json`, keys sorted.
    #[must_use]
    pub fn vocab_map(&self) -> BTreeMap<String, u32> {
        self.ids.iter().map(|(token, id)| (token.clone(), *id)).collect()
    }

    fn word_pieces(&self, word: &str, out: &mut Vec<u32>) {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > MAX_WORD_CHARS {
            out.push(self.special.unk);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let piece: String = chars[start..end].iter().collect();
                let candidate = if start > 0 { format!("{CONTINUATION}{piece}") } else { piece };
                if let Some(id) = self.ids.get(&candidate) {
                    found = Some(*id);
                    break;
                }
                end -= 1;
            }
            match found {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    out.push(self.special.unk);
                    return;
                }
            }
        }
        out.extend(pieces);
    }
}

impl Tokenizer for WordPieceTokenizer {
    fn encode(&self, text: &str) -> Encoding {
        let mut ids = Vec::new();
        for word in basic_tokenize(text) {
            self.word_pieces(&word, &mut ids);
        }
        ids.truncate(self.max_length - 2);

        let mut input_ids = Vec::with_capacity(self.max_length);
        input_ids.push(self.special.cls);
        input_ids.extend(ids);
        input_ids.push(self.special.sep);

        let used = input_ids.len();
        let mut attention_mask = vec![1; used];
        input_ids.resize(self.max_length, self.special.pad);
        attention_mask.resize(self.max_length, 0);

        Encoding { input_ids, attention_mask }
    }

    fn vocab_size(&self) -> usize {
        self.tokens.len()
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}

/// Lowercase and split on whitespace, with each punctuation char its own token.
#[must_use]
pub fn basic_tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch.is_control() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else if !ch.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(ch.to_string());
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
