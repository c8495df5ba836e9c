//! Search module - only provides search capabilities (primitives), does not control flow / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Search module only exposes primitive operations: index_file, search, remove_file
//! - The orchestrator controls the ingestion flow, statuses and rebuilds
//! - Call direction: orchestrator → search (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - In-memory inverted index over file name and extracted content
//! - Fuzzy (edit distance) + trailing-term prefix matching
//! - CJK support via jieba segmentation and name N-grams
//! - Structured highlight spans (never markup strings)

pub mod engine;
pub mod highlight;
pub mod schema;
pub mod tokenizer;

pub use engine::{IndexStats, SearchEngine};
pub use highlight::{excerpt, highlight, HighlightSpan};
pub use schema::{FieldKind, FileDocument, SearchHit, SearchOptions, Suggestion};
