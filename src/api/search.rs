use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use filesearch_backend::config;
use filesearch_backend::orchestrator::RebuildSnapshot;
use filesearch_backend::search::{excerpt, highlight, HighlightSpan, IndexStats, SearchOptions, Suggestion};

use crate::state::AppState;

use super::files::FileSummary;
use super::ApiResponse;

const EXCERPT_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    pub fuzzy: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub file: FileSummary,
    pub score: f32,
    pub matched_terms: Vec<String>,
    /// Highlight spans over the file name, byte offsets / 文件名高亮区间
    pub name_highlights: Vec<HighlightSpan>,
    /// Short excerpt of the content around the first match / 正文摘要
    pub excerpt: String,
    /// Highlight spans over the excerpt / 摘要高亮区间
    pub excerpt_highlights: Vec<HighlightSpan>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
}

/// POST /api/search - 搜索文件名与正文
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Json<ApiResponse<SearchResponse>> {
    if request.query.trim().is_empty() {
        return Json(ApiResponse::error("search query must not be empty"));
    }

    let search_config = config::config().search;
    let mut options = SearchOptions::new(request.query)
        .with_limit(request.limit.unwrap_or(search_config.result_limit))
        .fuzzy(request.fuzzy.unwrap_or(true));
    options.fuzzy_ratio = search_config.fuzzy_ratio;

    let matches = match state.orchestrator.search(&options).await {
        Ok(matches) => matches,
        Err(e) => return Json(ApiResponse::error(&format!("search failed: {}", e))),
    };

    let results: Vec<SearchResultItem> = matches
        .into_iter()
        .map(|m| {
            let name_highlights = highlight(&m.record.name, &m.matched_terms);
            let (snippet, excerpt_highlights) =
                excerpt(&m.record.content, &m.matched_terms, EXCERPT_LEN);
            SearchResultItem {
                file: FileSummary::from(&m.record),
                score: m.score,
                matched_terms: m.matched_terms,
                name_highlights,
                excerpt: snippet,
                excerpt_highlights,
            }
        })
        .collect();

    let total = results.len();
    Json(ApiResponse::success(SearchResponse { results, total }))
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub q: String,
    pub max: Option<usize>,
}

/// GET /api/search/suggest - 联想补全
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestParams>,
) -> Json<ApiResponse<Vec<Suggestion>>> {
    let search_config = config::config().search;
    let max = params.max.unwrap_or(search_config.max_suggestions);
    match state
        .orchestrator
        .suggestions(&params.q, max, search_config.fuzzy_ratio)
    {
        Ok(suggestions) => Json(ApiResponse::success(suggestions)),
        Err(e) => Json(ApiResponse::error(&format!("suggest failed: {}", e))),
    }
}

#[derive(Debug, Serialize)]
pub struct SearchStatus {
    pub rebuild: RebuildSnapshot,
    pub index: IndexStats,
}

/// GET /api/search/status - 索引状态
pub async fn status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SearchStatus>> {
    let rebuild = state.orchestrator.rebuild_state().await;
    let index = state.orchestrator.index_stats();
    Json(ApiResponse::success(SearchStatus { rebuild, index }))
}
