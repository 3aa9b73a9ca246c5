//! Bounded worker pool for processing many documents.
//!
//! Jobs go through an `async-channel` queue consumed by a fixed number of
//! worker tasks. Each job carries a oneshot sender for its result, so a
//! failing document only affects its own result.

use std::path::PathBuf;
use std::sync::Arc;

use papermeta_core::MetadataRecord;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ProcessError;
use crate::pipeline::Pipeline;

/// Per-document progress, emitted from worker tasks.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Finished {
        index: usize,
        total: usize,
        path: PathBuf,
        title: String,
        sidecar: PathBuf,
    },
    Failed {
        index: usize,
        total: usize,
        path: PathBuf,
        error: String,
    },
}

pub type DocumentResult = Result<(MetadataRecord, PathBuf), ProcessError>;

/// A document submitted to the pool.
pub struct DocumentJob {
    pub path: PathBuf,
    pub index: usize,
    pub total: usize,
    pub result_tx: oneshot::Sender<DocumentResult>,
}

/// Result of one document in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub path: PathBuf,
    pub result: DocumentResult,
}

/// Worker tasks sharing one [`Pipeline`].
pub struct DocumentPool {
    job_tx: async_channel::Sender<DocumentJob>,
    pool_handle: JoinHandle<()>,
}

impl DocumentPool {
    pub fn new(
        pipeline: Arc<Pipeline>,
        progress: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
        cancel: CancellationToken,
        num_workers: usize,
    ) -> Self {
        let (job_tx, job_rx) = async_channel::unbounded::<DocumentJob>();

        let pool_handle = tokio::spawn(async move {
            let mut handles = Vec::with_capacity(num_workers.max(1));
            for _ in 0..num_workers.max(1) {
                handles.push(tokio::spawn(worker_loop(
                    job_rx.clone(),
                    pipeline.clone(),
                    progress.clone(),
                    cancel.clone(),
                )));
            }
            drop(job_rx);
            for h in handles {
                let _ = h.await;
            }
        });

        Self {
            job_tx,
            pool_handle,
        }
    }

    pub async fn submit(&self, job: DocumentJob) {
        let _ = self.job_tx.send(job).await;
    }

    /// Close the queue and wait for the workers to drain it.
    pub async fn shutdown(self) {
        self.job_tx.close();
        let _ = self.pool_handle.await;
    }
}

async fn worker_loop(
    job_rx: async_channel::Receiver<DocumentJob>,
    pipeline: Arc<Pipeline>,
    progress: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
    cancel: CancellationToken,
) {
    while let Ok(job) = job_rx.recv().await {
        let DocumentJob {
            path,
            index,
            total,
            result_tx,
        } = job;

        if cancel.is_cancelled() {
            let _ = result_tx.send(Err(ProcessError::Cancelled));
            continue;
        }

        progress(ProgressEvent::Started {
            index,
            total,
            path: path.clone(),
        });

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ProcessError::Cancelled),
            r = pipeline.process_and_write(&path) => r,
        };

        match &result {
            Ok((record, sidecar)) => {
                tracing::info!(
                    path = %path.display(),
                    sidecar = %sidecar.display(),
                    "document processed"
                );
                progress(ProgressEvent::Finished {
                    index,
                    total,
                    path: path.clone(),
                    title: record.title.title.clone(),
                    sidecar: sidecar.clone(),
                });
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "document failed");
                progress(ProgressEvent::Failed {
                    index,
                    total,
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }

        let _ = result_tx.send(result);
    }
}

/// Process `paths` concurrently, returning one outcome per path in input order.
///
/// A cancelled batch still returns an outcome for every path; documents
/// that had not finished report [`ProcessError::Cancelled`].
pub async fn process_batch(
    paths: Vec<PathBuf>,
    pipeline: Arc<Pipeline>,
    progress: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
    cancel: CancellationToken,
) -> Vec<BatchOutcome> {
    let total = paths.len();
    let num_workers = pipeline.config().num_workers.min(total.max(1));
    tracing::info!(total, num_workers, "starting batch");

    let pool = DocumentPool::new(pipeline, progress, cancel, num_workers);
    let mut receivers = Vec::with_capacity(total);
    for (index, path) in paths.into_iter().enumerate() {
        let (result_tx, result_rx) = oneshot::channel();
        pool.submit(DocumentJob {
            path: path.clone(),
            index,
            total,
            result_tx,
        })
        .await;
        receivers.push((path, result_rx));
    }

    let mut outcomes = Vec::with_capacity(total);
    for (path, rx) in receivers {
        let result = rx
            .await
            .unwrap_or_else(|_| Err(ProcessError::Worker("worker exited before reporting".into())));
        outcomes.push(BatchOutcome { path, result });
    }
    pool.shutdown().await;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::info!(total, failed, "batch finished");
    outcomes
}
