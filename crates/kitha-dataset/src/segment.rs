//! Sentence-packing segmentation into tweet-length samples.

use crate::record::{char_len, Record, SegmentedRecord, TextType};

pub const DEFAULT_MAX_LENGTH: usize = 280;
pub const MIN_CHUNK_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segmenter {
    max_length: usize,
    min_chunk_chars: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self { max_length: DEFAULT_MAX_LENGTH, min_chunk_chars: MIN_CHUNK_CHARS }
    }
}

impl Segmenter {
    #[must_use]
    pub fn new(max_length: usize, min_chunk_chars: usize) -> Self {
        Self { max_length, min_chunk_chars }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    #[must_use]
    pub fn segment_all(&self, records: &[Record]) -> Vec<SegmentedRecord> {
        records.iter().flat_map(|r| self.segment(r)).collect()
    }

    /// Segment one record.
    ///
    /// Records within `max_length` pass through as `original_short`. Longer
    /// ones are cut at `.`, `!` and `?` and consecutive sentences are packed
    /// greedily into chunks; the terminators themselves are not kept. A
    /// sentence longer than `max_length` is dropped, so an over-length text
    /// with no terminators yields nothing.
    #[must_use]
    pub fn segment(&self, record: &Record) -> Vec<SegmentedRecord> {
        if char_len(&record.text) <= self.max_length {
            return vec![SegmentedRecord::derive(record, record.text.clone(), TextType::OriginalShort)];
        }

        let mut out = Vec::new();
        let mut chunk = String::new();
        let mut chunk_len = 0usize;

        for sentence in sentences(&record.text) {
            let sentence_len = char_len(sentence);
            if chunk_len + sentence_len + 1 <= self.max_length {
                if chunk.is_empty() {
                    chunk.push_str(sentence);
                    chunk_len = sentence_len;
                } else {
                    chunk.push(' ');
                    chunk.push_str(sentence);
                    chunk_len += sentence_len + 1;
                }
            } else {
                self.flush(record, &mut chunk, chunk_len, &mut out);
                if sentence_len <= self.max_length {
                    chunk.push_str(sentence);
                    chunk_len = sentence_len;
                } else {
                    chunk_len = 0;
                }
            }
        }
        self.flush(record, &mut chunk, chunk_len, &mut out);

        out
    }

    fn flush(&self, origin: &Record, chunk: &mut String, chunk_len: usize, out: &mut Vec<SegmentedRecord>) {
        let text = std::mem::take(chunk);
        if chunk_len >= self.min_chunk_chars {
            out.push(SegmentedRecord::derive(origin, text, TextType::Chunked));
        }
    }
}

/// `!` and `?` terminate sentences exactly like `.`.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty())
}
