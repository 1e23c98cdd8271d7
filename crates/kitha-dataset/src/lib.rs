//! Kitha Dataset
//!
//! Corpus assembly for human-vs-AI text detection:
//! - Declarative sources (`SourceSpec`) with per-source label maps
//! - Lazy row connectors for the datasets-server API and local files
//! - Normalization, sentence-packing segmentation, class balancing, splitting
//! - A two-format dataset store with statistics

pub mod assembly;
pub mod balance;
pub mod config;
pub mod error;
pub mod labels;
pub mod layout;
pub mod normalize;
pub mod record;
pub mod segment;
pub mod source;
pub mod split;
pub mod store;

pub use assembly::{Assembler, AssemblyReport, SourceReport, SourceStatus};
pub use balance::{balance, shuffle_rng};
pub use config::AssemblyConfig;
pub use error::{DatasetError, DatasetResult};
pub use labels::{LabelMap, MatchMode, Unmatched};
pub use layout::{DatasetLayout, Format, SPLIT_NAMES};
pub use normalize::{Normalized, Normalizer};
pub use record::{Label, Labeled, Record, SegmentedRecord, TextType};
pub use segment::Segmenter;
pub use source::{Backend, HubSettings, RawRow, RecordLayout, SourceConnector, SourceSpec};
pub use split::{split, Splits};
pub use store::{dataset_id, DatasetStats, DatasetStore};
