//! Extraction worker - off-thread text extraction / 后台文本提取
//!
//! Requests carry the file id as a correlation token; every request gets
//! exactly one response tagged with the same id. Extraction jobs run
//! concurrently on the blocking pool, so responses may come back in a
//! different order than the requests went out.

use tokio::sync::mpsc;
use tracing::debug;

use crate::extract::extract_text;

/// One extraction job / 一次提取任务
pub struct ExtractRequest {
    pub id: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

/// Worker reply, correlated by id / 按 id 关联的响应
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Processed { id: String, content: String },
    Error { id: String, error: String },
}

impl WorkerResponse {
    pub fn id(&self) -> &str {
        match self {
            WorkerResponse::Processed { id, .. } => id,
            WorkerResponse::Error { id, .. } => id,
        }
    }
}

/// Handle for submitting extraction jobs / 提取任务提交句柄
#[derive(Clone)]
pub struct ExtractionWorker {
    tx: mpsc::UnboundedSender<ExtractRequest>,
}

impl ExtractionWorker {
    /// Spawn the worker loop. Responses arrive on the returned receiver.
    pub fn spawn() -> (Self, mpsc::UnboundedReceiver<WorkerResponse>) {
        let (req_tx, mut req_rx) = mpsc::unbounded_channel::<ExtractRequest>();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel::<WorkerResponse>();

        tokio::spawn(async move {
            while let Some(req) = req_rx.recv().await {
                let resp_tx = resp_tx.clone();
                tokio::spawn(async move {
                    let ExtractRequest {
                        id,
                        declared_type,
                        bytes,
                    } = req;

                    debug!("extracting text: id={} type={}", id, declared_type);

                    let result =
                        tokio::task::spawn_blocking(move || extract_text(&bytes, &declared_type))
                            .await;

                    let response = match result {
                        Ok(Ok(content)) => WorkerResponse::Processed { id, content },
                        Ok(Err(e)) => WorkerResponse::Error {
                            id,
                            error: e.to_string(),
                        },
                        // extraction panicked; report it like any other failure
                        Err(e) => WorkerResponse::Error {
                            id,
                            error: format!("extraction task failed: {}", e),
                        },
                    };

                    let _ = resp_tx.send(response);
                });
            }
        });

        (Self { tx: req_tx }, resp_rx)
    }

    /// Queue a job; returns false if the worker loop has shut down.
    pub fn submit(&self, request: ExtractRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}
