//! Search index schema definition / 搜索索引的 Schema 定义

use serde::{Deserialize, Serialize};

use crate::models::FileRecord;

/// File document - the per-id snapshot stored in the index / 文件文档
///
/// Carries every field a search result needs to render, so hits can be
/// displayed without a secondary store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDocument {
    /// Record id / 记录ID
    pub id: String,
    /// File name / 文件名
    pub name: String,
    /// Declared MIME type / 声明的MIME类型
    pub declared_type: String,
    /// File size (bytes) / 文件大小
    pub size: i64,
    /// Ingestion time, RFC 3339 / 入库时间
    pub uploaded_at: String,
    /// Extracted text / 提取出的文本
    pub content: String,
}

impl From<&FileRecord> for FileDocument {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            declared_type: record.declared_type.clone(),
            size: record.size,
            uploaded_at: record.uploaded_at.clone(),
            content: record.content.clone(),
        }
    }
}

/// Which field a posting came from / 命中字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Name,
    Content,
}

impl FieldKind {
    /// Relevance boost: file-name matches count double / 文件名匹配权重加倍
    pub fn boost(&self) -> f32 {
        match self {
            FieldKind::Name => 2.0,
            FieldKind::Content => 1.0,
        }
    }
}

/// One ranked search hit / 一条搜索命中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Relevance score / 相关性分数
    pub score: f32,
    /// Index terms that actually matched, for highlighting; may extend
    /// beyond the literal query because of fuzzy/prefix expansion.
    pub matched_terms: Vec<String>,
}

/// One autosuggest candidate / 一条联想候选
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub term: String,
    pub score: f32,
}

/// Search query options / 搜索查询选项
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Search keywords / 搜索关键词
    pub query: String,
    /// Enable fuzzy matching / 启用模糊搜索
    pub fuzzy: bool,
    /// Edit-distance tolerance as a fraction of term length / 模糊容差（词长比例）
    pub fuzzy_ratio: f32,
    /// Maximum number of results to return / 最大返回结果数
    pub limit: usize,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fuzzy: true,
            fuzzy_ratio: 0.2,
            limit: 50,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn fuzzy(mut self, enabled: bool) -> Self {
        self.fuzzy = enabled;
        self
    }
}
