//! Search engine - in-memory full-text search implementation / 搜索引擎
//!
//! Architecture principle: only expose primitive operations, do not control flow / 架构原则
//! - index_file: insert or replace a single document / 索引单个文档
//! - index_all: full rebuild / 全量重建
//! - search: ranked fuzzy+prefix query / 搜索
//! - remove_file: delete by id / 删除文档
//! - clear: drop everything / 清空索引

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::schema::{FieldKind, FileDocument, SearchHit, SearchOptions, Suggestion};
use super::tokenizer::{contains_cjk, generate_ngrams, tokenize, tokenize_query};

/// Inverted index entry / 倒排索引条目
#[derive(Debug, Clone)]
struct PostingEntry {
    doc_id: String,
    field: FieldKind,
    /// How many times the term occurs in the field / 词在字段中出现的次数
    occurrences: usize,
}

/// Search engine / 搜索引擎
///
/// Inverted index over two fields (name, content) with a per-id document
/// snapshot. Supports:
/// - fuzzy matching (edit distance, ~20% of term length) / 模糊搜索
/// - prefix matching for the trailing query term / 前缀匹配
/// - CJK fuzzy matching via name N-grams / N-gram 模糊匹配
pub struct SearchEngine {
    /// Document storage: id -> FileDocument / 文档存储
    documents: RwLock<HashMap<String, FileDocument>>,
    /// Inverted index: token -> [PostingEntry] / 倒排索引
    inverted_index: RwLock<HashMap<String, Vec<PostingEntry>>>,
    /// N-gram index over names (for CJK fuzzy matching) / N-gram 索引
    ngram_index: RwLock<HashMap<String, Vec<String>>>,
    /// Index statistics / 索引统计
    stats: Mutex<IndexStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub term_count: usize,
    pub last_updated: Option<i64>,
}

const PREFIX_WEIGHT: f32 = 0.5;
const FUZZY_WEIGHT: f32 = 0.45;
const NGRAM_WEIGHT: f32 = 0.3;

impl SearchEngine {
    /// Create new search engine instance / 创建新的搜索引擎实例
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            inverted_index: RwLock::new(HashMap::new()),
            ngram_index: RwLock::new(HashMap::new()),
            stats: Mutex::new(IndexStats::default()),
        }
    }

    /// Get index statistics / 获取索引统计信息
    pub fn stats(&self) -> IndexStats {
        let mut stats = self.stats.lock().clone();
        stats.document_count = self.document_count();
        stats.term_count = self
            .inverted_index
            .read()
            .map(|i| i.len())
            .unwrap_or(0);
        stats
    }

    /// Index a document, replacing any previous entry for the same id
    /// (primitive operation, idempotent: last write wins) / 索引单个文档
    pub fn index_file(&self, doc: FileDocument) -> Result<(), String> {
        // Replace semantics: never two entries for one id / 替换语义
        self.remove_postings(&doc.id)?;

        let doc_id = doc.id.clone();

        let name_tokens = count_tokens(&tokenize(&doc.name));
        let content_tokens = count_tokens(&tokenize(&doc.content));
        let name_ngrams = generate_ngrams(&doc.name, 1, 3);

        {
            let mut index = self.inverted_index.write().map_err(|e| e.to_string())?;

            for (token, occurrences) in name_tokens {
                index.entry(token).or_default().push(PostingEntry {
                    doc_id: doc_id.clone(),
                    field: FieldKind::Name,
                    occurrences,
                });
            }

            for (token, occurrences) in content_tokens {
                index.entry(token).or_default().push(PostingEntry {
                    doc_id: doc_id.clone(),
                    field: FieldKind::Content,
                    occurrences,
                });
            }
        }

        {
            let mut ngram_idx = self.ngram_index.write().map_err(|e| e.to_string())?;
            for ngram in name_ngrams {
                ngram_idx.entry(ngram).or_default().push(doc_id.clone());
            }
        }

        {
            let mut docs = self.documents.write().map_err(|e| e.to_string())?;
            docs.insert(doc_id, doc);
        }

        {
            let mut stats = self.stats.lock();
            stats.last_updated = Some(chrono::Utc::now().timestamp());
        }

        Ok(())
    }

    /// Full rebuild: clear everything, then index the given documents.
    /// O(total terms); runs once per session at startup / 全量重建
    pub fn index_all(&self, docs: Vec<FileDocument>) -> Result<usize, String> {
        self.clear()?;
        let mut indexed = 0;
        for doc in docs {
            if self.index_file(doc).is_ok() {
                indexed += 1;
            }
        }
        Ok(indexed)
    }

    /// Search (primitive operation) / 搜索
    ///
    /// Empty or whitespace-only queries return no results - search is never
    /// an implicit "match all".
    pub fn search(&self, options: &SearchOptions) -> Result<Vec<SearchHit>, String> {
        if options.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_tokens = tokenize_query(&options.query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<String, f32> = HashMap::new();
        let mut matched: HashMap<String, HashSet<String>> = HashMap::new();

        {
            let index = self.inverted_index.read().map_err(|e| e.to_string())?;

            // Exact term matches / 精确匹配
            for token in &query_tokens {
                if let Some(postings) = index.get(token) {
                    for posting in postings {
                        *scores.entry(posting.doc_id.clone()).or_default() += posting.field.boost()
                            * (1.0 + posting.occurrences as f32 * 0.1);
                        matched
                            .entry(posting.doc_id.clone())
                            .or_default()
                            .insert(token.clone());
                    }
                }
            }

            // Prefix expansion for the trailing (possibly partial) term / 前缀匹配
            if let Some(last) = query_tokens.last() {
                for (idx_token, postings) in index.iter() {
                    if idx_token.starts_with(last.as_str()) && idx_token != last {
                        for posting in postings {
                            *scores.entry(posting.doc_id.clone()).or_default() +=
                                posting.field.boost() * PREFIX_WEIGHT;
                            matched
                                .entry(posting.doc_id.clone())
                                .or_default()
                                .insert(idx_token.clone());
                        }
                    }
                }
            }

            // Edit-distance fuzzy matching / 编辑距离模糊匹配
            if options.fuzzy {
                for token in &query_tokens {
                    let max_distance = fuzzy_distance(token, options.fuzzy_ratio);
                    if max_distance == 0 {
                        continue;
                    }
                    for (idx_token, postings) in index.iter() {
                        if idx_token == token {
                            continue;
                        }
                        if fuzzy_match(token, idx_token, max_distance) {
                            for posting in postings {
                                *scores.entry(posting.doc_id.clone()).or_default() +=
                                    posting.field.boost() * FUZZY_WEIGHT;
                                matched
                                    .entry(posting.doc_id.clone())
                                    .or_default()
                                    .insert(idx_token.clone());
                            }
                        }
                    }
                }
            }
        }

        // N-gram fuzzy matching for CJK queries / 中文 N-gram 模糊匹配
        if options.fuzzy && contains_cjk(&options.query) {
            let ngram_idx = self.ngram_index.read().map_err(|e| e.to_string())?;
            for ngram in generate_ngrams(&options.query, 1, 2) {
                if let Some(doc_ids) = ngram_idx.get(&ngram) {
                    for doc_id in doc_ids {
                        *scores.entry(doc_id.clone()).or_default() += NGRAM_WEIGHT;
                        matched
                            .entry(doc_id.clone())
                            .or_default()
                            .insert(ngram.clone());
                    }
                }
            }
        }

        let docs = self.documents.read().map_err(|e| e.to_string())?;

        let mut results: Vec<SearchHit> = scores
            .into_iter()
            .filter(|(doc_id, _)| docs.contains_key(doc_id))
            .map(|(doc_id, score)| {
                let mut matched_terms: Vec<String> = matched
                    .remove(&doc_id)
                    .map(|set| set.into_iter().collect())
                    .unwrap_or_default();
                matched_terms.sort();
                SearchHit {
                    id: doc_id,
                    score,
                    matched_terms,
                }
            })
            .collect();

        // Score descending, id as tie-break for a stable order / 按分数排序
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(options.limit);

        Ok(results)
    }

    /// Autosuggest completion terms for the trailing token / 联想词
    ///
    /// `fuzzy_ratio` is the same edit-distance budget search uses; 0 makes
    /// suggestions prefix-only.
    pub fn get_suggestions(
        &self,
        partial: &str,
        max: usize,
        fuzzy_ratio: f32,
    ) -> Result<Vec<Suggestion>, String> {
        let tokens = tokenize_query(partial);
        let last = match tokens.last() {
            Some(t) => t.clone(),
            None => return Ok(Vec::new()),
        };
        let max_distance = fuzzy_distance(&last, fuzzy_ratio);

        let index = self.inverted_index.read().map_err(|e| e.to_string())?;
        let mut candidates: Vec<Suggestion> = index
            .iter()
            .filter(|(idx_token, _)| {
                idx_token.starts_with(last.as_str())
                    || (max_distance > 0 && fuzzy_match(&last, idx_token, max_distance))
            })
            .map(|(idx_token, postings)| {
                let score: f32 = postings
                    .iter()
                    .map(|p| p.field.boost() * (1.0 + p.occurrences as f32 * 0.1))
                    .sum();
                Suggestion {
                    term: idx_token.clone(),
                    score,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.term.cmp(&b.term))
        });
        candidates.truncate(max);

        Ok(candidates)
    }

    /// Remove a document (primitive operation) / 删除文档
    ///
    /// Returns false (not an error) when the id was never indexed.
    pub fn remove_file(&self, doc_id: &str) -> Result<bool, String> {
        self.remove_postings(doc_id)?;

        let removed = {
            let mut docs = self.documents.write().map_err(|e| e.to_string())?;
            docs.remove(doc_id).is_some()
        };

        if removed {
            let mut stats = self.stats.lock();
            stats.last_updated = Some(chrono::Utc::now().timestamp());
        }

        Ok(removed)
    }

    /// Drop a document's postings and n-grams, keeping the snapshot / 清除倒排条目
    fn remove_postings(&self, doc_id: &str) -> Result<(), String> {
        let doc = {
            let docs = self.documents.read().map_err(|e| e.to_string())?;
            docs.get(doc_id).cloned()
        };

        let Some(doc) = doc else {
            return Ok(());
        };

        {
            let mut index = self.inverted_index.write().map_err(|e| e.to_string())?;
            for token in tokenize(&doc.name).into_iter().chain(tokenize(&doc.content)) {
                if let Some(postings) = index.get_mut(&token) {
                    postings.retain(|p| p.doc_id != doc_id);
                    if postings.is_empty() {
                        index.remove(&token);
                    }
                }
            }
        }

        {
            let mut ngram_idx = self.ngram_index.write().map_err(|e| e.to_string())?;
            for ngram in generate_ngrams(&doc.name, 1, 3) {
                if let Some(doc_ids) = ngram_idx.get_mut(&ngram) {
                    doc_ids.retain(|id| id != doc_id);
                    if doc_ids.is_empty() {
                        ngram_idx.remove(&ngram);
                    }
                }
            }
        }

        Ok(())
    }

    /// Clear all indexes (primitive operation) / 清空所有索引
    pub fn clear(&self) -> Result<(), String> {
        {
            let mut docs = self.documents.write().map_err(|e| e.to_string())?;
            docs.clear();
        }
        {
            let mut index = self.inverted_index.write().map_err(|e| e.to_string())?;
            index.clear();
        }
        {
            let mut ngram_idx = self.ngram_index.write().map_err(|e| e.to_string())?;
            ngram_idx.clear();
        }
        {
            let mut stats = self.stats.lock();
            *stats = IndexStats::default();
        }
        Ok(())
    }

    /// Look up a stored document snapshot / 获取文档快照
    pub fn document(&self, doc_id: &str) -> Option<FileDocument> {
        self.documents
            .read()
            .ok()
            .and_then(|d| d.get(doc_id).cloned())
    }

    /// Number of indexed documents / 获取文档数量
    pub fn document_count(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate a token stream into per-term occurrence counts
fn count_tokens(tokens: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

/// Edit-distance budget for a term: ~20% of its length by default
fn fuzzy_distance(term: &str, ratio: f32) -> usize {
    (term.chars().count() as f32 * ratio).round() as usize
}

/// Bounded edit-distance match / 编辑距离模糊匹配
fn fuzzy_match(s1: &str, s2: &str, max_distance: usize) -> bool {
    if s1 == s2 {
        return true;
    }

    let len1 = s1.chars().count();
    let len2 = s2.chars().count();

    // Length gap alone already exceeds the budget / 长度差太大直接返回
    if len1.abs_diff(len2) > max_distance {
        return false;
    }

    levenshtein_distance(s1, s2) <= max_distance
}

/// Levenshtein edit distance / 计算编辑距离
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0usize; len2 + 1]; len1 + 1];

    for i in 0..=len1 {
        matrix[i][0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[len1][len2]
}
