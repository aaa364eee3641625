//! Single-worker queue that serialises regeneration runs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A merchant to regenerate, as requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegenerateRequest {
    pub merchant_id: String,
    pub merchant_name: String,
}

/// Work executed for each dequeued request.
#[async_trait]
pub(crate) trait RegenerateRunner: Send + Sync {
    async fn run(&self, request: &RegenerateRequest) -> anyhow::Result<()>;
}

/// Outcome counts returned by [`RegenerationQueue::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct QueueSummary {
    pub succeeded: usize,
    pub failed: Vec<String>,
}

/// FIFO queue drained by one worker task, so at most one run is in flight.
pub(crate) struct RegenerationQueue {
    sender: mpsc::UnboundedSender<RegenerateRequest>,
    worker: JoinHandle<QueueSummary>,
}

impl RegenerationQueue {
    pub(crate) fn spawn(runner: Arc<dyn RegenerateRunner>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<RegenerateRequest>();

        let worker = tokio::spawn(async move {
            let mut summary = QueueSummary::default();
            while let Some(request) = receiver.recv().await {
                tracing::info!(merchant_id = %request.merchant_id, "regeneration started");
                match runner.run(&request).await {
                    Ok(()) => {
                        tracing::info!(merchant_id = %request.merchant_id, "regeneration finished");
                        summary.succeeded += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            merchant_id = %request.merchant_id,
                            error = ?e,
                            "regeneration failed"
                        );
                        summary.failed.push(request.merchant_id);
                    }
                }
            }
            summary
        });

        Self { sender, worker }
    }

    /// Queues a request behind any already waiting.
    ///
    /// # Errors
    ///
    /// Fails only if the worker has stopped.
    pub(crate) fn enqueue(&self, request: RegenerateRequest) -> anyhow::Result<()> {
        self.sender
            .send(request)
            .map_err(|e| anyhow::anyhow!("regeneration worker stopped; dropped {}", e.0.merchant_id))
    }

    /// Stops accepting requests and waits for queued ones to finish.
    ///
    /// # Errors
    ///
    /// Fails if the worker task panicked.
    pub(crate) async fn shutdown(self) -> anyhow::Result<QueueSummary> {
        drop(self.sender);
        Ok(self.worker.await?)
    }
}
