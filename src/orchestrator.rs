//! File lifecycle orchestration / 文件生命周期调度
//!
//! Owns the in-memory record map and wires the record store, the search
//! engine and the extraction worker together. Worker responses are applied
//! persist-first: the database is updated before the in-memory record and
//! the index, so a crash between the two never loses a finished extraction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{FileRecord, ProcessingStatus, UploadedFile};
use crate::search::{FileDocument, SearchEngine, SearchHit, SearchOptions, Suggestion};
use crate::store::FileStore;
use crate::worker::{ExtractRequest, ExtractionWorker, WorkerResponse};

/// Startup index rebuild progress / 启动重建索引进度
#[derive(Default)]
struct RebuildState {
    running: AtomicBool,
    completed: AtomicBool,
    indexed: AtomicUsize,
}

/// Snapshot of the rebuild progress for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RebuildSnapshot {
    pub running: bool,
    pub completed: bool,
    pub indexed_files: usize,
    pub total_files: usize,
}

/// A search hit joined back onto its file record
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub record: FileRecord,
    pub score: f32,
    pub matched_terms: Vec<String>,
}

pub struct Orchestrator {
    store: FileStore,
    engine: Arc<SearchEngine>,
    files: RwLock<HashMap<String, FileRecord>>,
    worker: ExtractionWorker,
    rebuild: RebuildState,
}

impl Orchestrator {
    /// Create the orchestrator and start pumping worker responses.
    pub fn new(store: FileStore) -> Arc<Self> {
        let (worker, mut responses) = ExtractionWorker::spawn();
        let orchestrator = Arc::new(Self {
            store,
            engine: Arc::new(SearchEngine::new()),
            files: RwLock::new(HashMap::new()),
            worker,
            rebuild: RebuildState::default(),
        });

        let pump = orchestrator.clone();
        tokio::spawn(async move {
            while let Some(message) = responses.recv().await {
                pump.on_worker_message(message).await;
            }
        });

        orchestrator
    }

    /// Load persisted records and rebuild the index / 加载记录并重建索引
    ///
    /// Records stuck in a non-terminal status were interrupted by a previous
    /// shutdown; they are marked as errored rather than silently retried.
    pub async fn load_on_startup(&self) -> Result<()> {
        self.rebuild.running.store(true, Ordering::SeqCst);

        let mut records = self.store.list().await?;
        for record in records.iter_mut() {
            if !record.status.is_terminal() {
                warn!(
                    "file {} was {} at shutdown, marking errored",
                    record.id,
                    record.status.as_str()
                );
                record.status = ProcessingStatus::Error;
                record.error = Some("extraction interrupted by restart".to_string());
                self.store
                    .update_status(&record.id, ProcessingStatus::Error, record.error.as_deref())
                    .await?;
            }
        }

        let docs: Vec<FileDocument> = records.iter().map(FileDocument::from).collect();
        let indexed = self.engine.index_all(docs).map_err(|e| anyhow!(e))?;

        {
            let mut files = self.files.write().await;
            files.clear();
            for record in records {
                files.insert(record.id.clone(), record);
            }
        }

        self.rebuild.indexed.store(indexed, Ordering::SeqCst);
        self.rebuild.running.store(false, Ordering::SeqCst);
        self.rebuild.completed.store(true, Ordering::SeqCst);
        info!("startup index rebuild finished: {} files", indexed);

        Ok(())
    }

    /// Accept a batch of uploads / 接收一批上传
    ///
    /// Each file succeeds or fails on its own; one bad file never blocks
    /// the rest of the batch.
    pub async fn upload(&self, uploads: Vec<UploadedFile>) -> Vec<Result<FileRecord>> {
        let mut results = Vec::with_capacity(uploads.len());
        for upload in uploads {
            results.push(self.upload_one(upload).await);
        }
        results
    }

    async fn upload_one(&self, upload: UploadedFile) -> Result<FileRecord> {
        let now = Utc::now().to_rfc3339();
        let mut record = FileRecord {
            id: Uuid::new_v4().to_string(),
            name: upload.name,
            declared_type: upload.declared_type,
            size: upload.bytes.len() as i64,
            last_modified_at: upload.last_modified_at.unwrap_or_else(|| now.clone()),
            uploaded_at: now,
            content: String::new(),
            status: ProcessingStatus::Pending,
            error: None,
        };

        self.store.add(&record).await?;

        record.status = ProcessingStatus::Processing;
        self.store
            .update_status(&record.id, ProcessingStatus::Processing, None)
            .await?;

        // the name is searchable immediately, before extraction finishes
        if let Err(e) = self.engine.index_file(FileDocument::from(&record)) {
            error!("failed to index uploaded file {}: {}", record.id, e);
        }

        // the record must be in the map before dispatch: the worker response
        // arrives on another task and is discarded for unknown ids
        {
            let mut files = self.files.write().await;
            files.insert(record.id.clone(), record.clone());
        }

        if !self.worker.submit(ExtractRequest {
            id: record.id.clone(),
            declared_type: record.declared_type.clone(),
            bytes: upload.bytes,
        }) {
            record.status = ProcessingStatus::Error;
            record.error = Some("extraction worker unavailable".to_string());
            self.store
                .update_status(&record.id, ProcessingStatus::Error, record.error.as_deref())
                .await?;
            self.mark_error(&record.id, "extraction worker unavailable".to_string())
                .await;
        }

        info!("accepted upload: {} ({})", record.name, record.id);

        Ok(record)
    }

    /// Apply a worker response to the matching record / 处理提取结果
    ///
    /// Responses for ids no longer known (the file was deleted while its
    /// extraction was in flight) are discarded.
    pub async fn on_worker_message(&self, message: WorkerResponse) {
        let id = message.id().to_string();
        {
            let files = self.files.read().await;
            if !files.contains_key(&id) {
                debug!("discarding worker response for unknown file {}", id);
                return;
            }
        }

        match message {
            WorkerResponse::Processed { id, content } => {
                if let Err(e) = self.store.update_content(&id, &content).await {
                    error!("failed to persist extracted content for {}: {}", id, e);
                    self.mark_error(&id, format!("failed to persist content: {}", e))
                        .await;
                    return;
                }

                let mut files = self.files.write().await;
                if let Some(record) = files.get_mut(&id) {
                    record.content = content;
                    record.status = ProcessingStatus::Processed;
                    record.error = None;
                    if let Err(e) = self.engine.index_file(FileDocument::from(&*record)) {
                        error!("failed to index extracted content for {}: {}", id, e);
                    }
                    debug!("file {} processed ({} bytes of text)", id, record.content.len());
                }
            }
            WorkerResponse::Error { id, error } => {
                warn!("extraction failed for {}: {}", id, error);
                if let Err(e) = self
                    .store
                    .update_status(&id, ProcessingStatus::Error, Some(&error))
                    .await
                {
                    error!("failed to persist error status for {}: {}", id, e);
                }
                self.mark_error(&id, error).await;
            }
        }
    }

    async fn mark_error(&self, id: &str, error: String) {
        let mut files = self.files.write().await;
        if let Some(record) = files.get_mut(id) {
            record.status = ProcessingStatus::Error;
            record.error = Some(error);
        }
    }

    /// Delete a file everywhere; unknown ids are a no-op / 删除文件
    pub async fn delete_file(&self, id: &str) -> Result<bool> {
        {
            let files = self.files.read().await;
            if !files.contains_key(id) {
                return Ok(false);
            }
        }

        self.store.delete(id).await?;

        // map removal and index removal happen under the same write lock the
        // response handler indexes under, so a response racing this delete
        // either indexes before the purge or misses the map and is discarded
        {
            let mut files = self.files.write().await;
            if files.remove(id).is_none() {
                return Ok(false);
            }
            self.engine.remove_file(id).map_err(|e| anyhow!(e))?;
        }
        info!("deleted file {}", id);

        Ok(true)
    }

    /// Search and join hits back onto their records / 搜索
    ///
    /// Refused while the startup rebuild has not finished, so callers can
    /// render a loading state instead of silently incomplete results.
    pub async fn search(&self, options: &SearchOptions) -> Result<Vec<SearchMatch>> {
        if !self.rebuild.completed.load(Ordering::SeqCst) {
            return Err(anyhow!("index rebuild in progress"));
        }

        let hits: Vec<SearchHit> = self.engine.search(options).map_err(|e| anyhow!(e))?;

        let files = self.files.read().await;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                files.get(&hit.id).map(|record| SearchMatch {
                    record: record.clone(),
                    score: hit.score,
                    matched_terms: hit.matched_terms,
                })
            })
            .collect())
    }

    /// Autosuggest completions for a partial query / 联想建议
    pub fn suggestions(&self, partial: &str, max: usize, fuzzy_ratio: f32) -> Result<Vec<Suggestion>> {
        if !self.rebuild.completed.load(Ordering::SeqCst) {
            return Err(anyhow!("index rebuild in progress"));
        }
        self.engine
            .get_suggestions(partial, max, fuzzy_ratio)
            .map_err(|e| anyhow!(e))
    }

    /// All records, oldest upload first / 文件列表
    pub async fn list_files(&self) -> Vec<FileRecord> {
        let files = self.files.read().await;
        let mut records: Vec<FileRecord> = files.values().cloned().collect();
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    pub async fn get_file(&self, id: &str) -> Option<FileRecord> {
        let files = self.files.read().await;
        files.get(id).cloned()
    }

    pub fn index_stats(&self) -> crate::search::IndexStats {
        self.engine.stats()
    }

    pub async fn rebuild_state(&self) -> RebuildSnapshot {
        let files = self.files.read().await;
        RebuildSnapshot {
            running: self.rebuild.running.load(Ordering::SeqCst),
            completed: self.rebuild.completed.load(Ordering::SeqCst),
            indexed_files: self.rebuild.indexed.load(Ordering::SeqCst),
            total_files: files.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::run_migrations;
    use sqlx::SqlitePool;
    use std::time::Duration;

    async fn test_orchestrator() -> Arc<Orchestrator> {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let orch = Orchestrator::new(FileStore::new(pool));
        orch.load_on_startup().await.unwrap();
        orch
    }

    fn text_upload(name: &str, body: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            declared_type: "text/plain".to_string(),
            last_modified_at: None,
            bytes: body.as_bytes().to_vec(),
        }
    }

    async fn wait_for_terminal(orch: &Orchestrator, id: &str) -> FileRecord {
        for _ in 0..100 {
            if let Some(record) = orch.get_file(id).await {
                if record.status.is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("file {} never reached a terminal status", id);
    }

    #[tokio::test]
    async fn test_upload_extract_and_search() {
        let orch = test_orchestrator().await;
        let mut results = orch
            .upload(vec![text_upload("notes.txt", "the quick brown fox")])
            .await;
        let record = results.remove(0).unwrap();
        assert_eq!(record.status, ProcessingStatus::Processing);

        let done = wait_for_terminal(&orch, &record.id).await;
        assert_eq!(done.status, ProcessingStatus::Processed);
        assert_eq!(done.content, "the quick brown fox");

        let matches = orch
            .search(&SearchOptions::new("quick fox"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, record.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rapid_uploads_never_stay_processing() {
        // tiny text files extract almost instantly, so the response can
        // land while the upload call is still persisting; every record
        // must still reach Processed
        let orch = test_orchestrator().await;
        let mut ids = Vec::new();
        for i in 0..100 {
            let record = orch
                .upload(vec![text_upload(&format!("t{}.txt", i), "tiny")])
                .await
                .remove(0)
                .unwrap();
            ids.push(record.id);
        }

        for id in ids {
            let done = wait_for_terminal(&orch, &id).await;
            assert_eq!(done.status, ProcessingStatus::Processed);
            assert_eq!(done.content, "tiny");
        }
    }

    #[tokio::test]
    async fn test_batch_attribution_is_by_id() {
        let orch = test_orchestrator().await;
        let uploads = (0..8)
            .map(|i| text_upload(&format!("doc{}.txt", i), &format!("unique token alpha{}", i)))
            .collect();
        let records: Vec<FileRecord> = orch
            .upload(uploads)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for record in &records {
            let done = wait_for_terminal(&orch, &record.id).await;
            let n = record.name.trim_start_matches("doc").trim_end_matches(".txt");
            assert_eq!(done.content, format!("unique token alpha{}", n));
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_errors_without_blocking_batch() {
        let orch = test_orchestrator().await;
        let results = orch
            .upload(vec![
                UploadedFile {
                    name: "broken.pdf".to_string(),
                    declared_type: "application/pdf".to_string(),
                    last_modified_at: None,
                    bytes: b"definitely not a pdf".to_vec(),
                },
                text_upload("fine.txt", "healthy content"),
            ])
            .await;
        let ids: Vec<String> = results.into_iter().map(|r| r.unwrap().id).collect();

        let broken = wait_for_terminal(&orch, &ids[0]).await;
        assert_eq!(broken.status, ProcessingStatus::Error);
        assert!(broken.error.is_some());
        assert!(broken.content.is_empty());

        let fine = wait_for_terminal(&orch, &ids[1]).await;
        assert_eq!(fine.status, ProcessingStatus::Processed);

        // the errored file stays listed and findable by name
        assert_eq!(orch.list_files().await.len(), 2);
        let by_name = orch.search(&SearchOptions::new("broken")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].record.id, ids[0]);
    }

    #[tokio::test]
    async fn test_delete_removes_everywhere() {
        let orch = test_orchestrator().await;
        let record = orch
            .upload(vec![text_upload("gone.txt", "ephemeral words")])
            .await
            .remove(0)
            .unwrap();
        wait_for_terminal(&orch, &record.id).await;

        assert!(orch.delete_file(&record.id).await.unwrap());
        assert!(orch.list_files().await.is_empty());
        assert!(orch
            .search(&SearchOptions::new("ephemeral"))
            .await
            .unwrap()
            .is_empty());

        // unknown id is a no-op
        assert!(!orch.delete_file(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_worker_message_is_discarded() {
        let orch = test_orchestrator().await;
        let record = orch
            .upload(vec![text_upload("racy.txt", "short lived")])
            .await
            .remove(0)
            .unwrap();
        wait_for_terminal(&orch, &record.id).await;
        orch.delete_file(&record.id).await.unwrap();

        orch.on_worker_message(WorkerResponse::Processed {
            id: record.id.clone(),
            content: "late arrival".to_string(),
        })
        .await;

        assert!(orch.get_file(&record.id).await.is_none());
        assert!(orch.engine.document(&record.id).is_none());
        assert!(orch
            .search(&SearchOptions::new("late arrival"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_racing_duplicate_response_leaves_no_index_entry() {
        // a delete and a (late, duplicate) worker response may interleave
        // either way; neither order may leave an index entry behind
        let orch = test_orchestrator().await;
        for i in 0..20 {
            let record = orch
                .upload(vec![text_upload(&format!("r{}.txt", i), "transient body")])
                .await
                .remove(0)
                .unwrap();
            wait_for_terminal(&orch, &record.id).await;

            let id = record.id.clone();
            let deleter = {
                let orch = orch.clone();
                let id = id.clone();
                tokio::spawn(async move { orch.delete_file(&id).await.unwrap() })
            };
            let responder = {
                let orch = orch.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    orch.on_worker_message(WorkerResponse::Processed {
                        id,
                        content: "transient body".to_string(),
                    })
                    .await;
                })
            };
            deleter.await.unwrap();
            responder.await.unwrap();

            assert!(orch.get_file(&id).await.is_none());
            assert!(orch.engine.document(&id).is_none());
        }
        assert!(orch
            .search(&SearchOptions::new("transient"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_upload_results_align_with_input_order() {
        // callers pair outcomes with inputs positionally
        let orch = test_orchestrator().await;
        let results = orch
            .upload(vec![
                text_upload("first.txt", "one"),
                text_upload("second.txt", "two"),
                text_upload("third.txt", "three"),
            ])
            .await;

        let names: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().name)
            .collect();
        assert_eq!(names, vec!["first.txt", "second.txt", "third.txt"]);
    }

    #[tokio::test]
    async fn test_startup_interrupts_stale_records_and_rebuilds() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = FileStore::new(pool.clone());

        let now = Utc::now().to_rfc3339();
        let finished = FileRecord {
            id: "done".to_string(),
            name: "report.txt".to_string(),
            declared_type: "text/plain".to_string(),
            size: 10,
            last_modified_at: now.clone(),
            uploaded_at: now.clone(),
            content: "quarterly figures".to_string(),
            status: ProcessingStatus::Processed,
            error: None,
        };
        let stuck = FileRecord {
            id: "stuck".to_string(),
            name: "half.pdf".to_string(),
            declared_type: "application/pdf".to_string(),
            size: 10,
            last_modified_at: now.clone(),
            uploaded_at: now,
            content: String::new(),
            status: ProcessingStatus::Processing,
            error: None,
        };
        store.add(&finished).await.unwrap();
        store.add(&stuck).await.unwrap();

        let orch = Orchestrator::new(FileStore::new(pool));

        // queries are refused until the rebuild has run
        assert!(orch.search(&SearchOptions::new("quarterly")).await.is_err());

        orch.load_on_startup().await.unwrap();

        let snapshot = orch.rebuild_state().await;
        assert!(snapshot.completed);
        assert!(!snapshot.running);
        assert_eq!(snapshot.indexed_files, 2);
        assert_eq!(snapshot.total_files, 2);

        let interrupted = orch.get_file("stuck").await.unwrap();
        assert_eq!(interrupted.status, ProcessingStatus::Error);
        assert_eq!(
            interrupted.error.as_deref(),
            Some("extraction interrupted by restart")
        );

        let matches = orch
            .search(&SearchOptions::new("quarterly"))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, "done");
    }

    #[tokio::test]
    async fn test_suggestions_after_upload() {
        let orch = test_orchestrator().await;
        let record = orch
            .upload(vec![text_upload("fruits.txt", "apple apricot banana")])
            .await
            .remove(0)
            .unwrap();
        wait_for_terminal(&orch, &record.id).await;

        let suggestions = orch.suggestions("ap", 5, 0.2).unwrap();
        let terms: Vec<&str> = suggestions.iter().map(|s| s.term.as_str()).collect();
        assert!(terms.contains(&"apple"));
        assert!(terms.contains(&"apricot"));
    }
}
