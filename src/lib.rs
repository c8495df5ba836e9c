//! Local document search backend / 本地文档搜索后端
//!
//! Upload documents, extract their text off the request path, and search
//! the extracted text together with file names.

pub mod config;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod search;
pub mod store;
pub mod worker;
