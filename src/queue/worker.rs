//! Background worker that drains the ingestion queue.
//!
//! Pulls one job at a time and drives the cache-check -> fetch -> persist
//! sequence for its document. Every job error is caught at the job
//! boundary: it is logged with the document id and the job is marked
//! failed, but the worker keeps running and the queue is never asked to
//! redeliver on failure.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::store::{JobQueueStore, QueueJob};
use crate::cache::{self, CacheStore};
use crate::config::WorkerSettings;
use crate::error::IngestError;
use crate::models::{BenefitDataset, DocumentId};
use crate::provider::BenefitProvider;
use crate::search_index::SearchIndex;

/// Terminal outcome of one job. Both states are terminal: failed jobs stay
/// failed until an operator resubmits the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed,
}

/// Queue consumer for benefit ingestion.
pub struct IngestWorker {
    queue: Arc<dyn JobQueueStore>,
    cache: Arc<dyn CacheStore>,
    provider: Arc<dyn BenefitProvider>,
    index: Arc<dyn SearchIndex>,
    poll_interval: Duration,
    cache_ttl: Duration,
    stale_threshold_secs: i64,
}

impl IngestWorker {
    pub fn new(
        queue: Arc<dyn JobQueueStore>,
        cache: Arc<dyn CacheStore>,
        provider: Arc<dyn BenefitProvider>,
        index: Arc<dyn SearchIndex>,
        settings: &WorkerSettings,
    ) -> Self {
        Self {
            queue,
            cache,
            provider,
            index,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            cache_ttl: Duration::from_secs(settings.cache_ttl_secs),
            stale_threshold_secs: settings.stale_job_threshold_secs,
        }
    }

    /// Main processing loop - call from a spawned task.
    ///
    /// Claims jobs until cancelled; sleeps for the poll interval when the
    /// queue is empty.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Ingestion worker starting (poll_interval={}s)",
            self.poll_interval.as_secs()
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.queue.claim_next() {
                Ok(Some(job)) => {
                    self.handle_job(&job).await;
                    continue;
                }
                Ok(None) => {
                    match self.queue.requeue_stale(self.stale_threshold_secs) {
                        Ok(count) if count > 0 => {
                            warn!("Requeued {} stale in-progress jobs", count);
                            continue;
                        }
                        Ok(_) => {}
                        Err(err) => error!("Failed to requeue stale jobs: {}", err),
                    }
                }
                Err(err) => {
                    error!("Failed to claim next job: {}", err);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Ingestion worker stopped");
    }

    /// Process one claimed job to a terminal state.
    pub async fn handle_job(&self, job: &QueueJob) -> JobOutcome {
        match self.process_document(&job.document).await {
            Ok(()) => {
                if let Err(err) = self.queue.mark_done(&job.id) {
                    error!("Failed to mark job {} done: {}", job.id, err);
                }
                info!("Processed document {} (job {})", job.document, job.id);
                JobOutcome::Success
            }
            Err(err) => {
                error!(
                    "Failed to process document {} (job {}): {}",
                    job.document, job.id, err
                );
                if let Err(mark_err) = self.queue.mark_failed(&job.id, &err.to_string()) {
                    error!("Failed to mark job {} failed: {}", job.id, mark_err);
                }
                JobOutcome::Failed
            }
        }
    }

    /// Cache-aside processing of one document.
    ///
    /// An already-cached document is a deliberate no-op, not a refresh.
    /// On a miss the dataset is fetched, indexed, and only then cached:
    /// a crash between the two writes must never leave a document cached
    /// but unindexed.
    async fn process_document(&self, document: &DocumentId) -> Result<(), IngestError> {
        let cached: Option<BenefitDataset> =
            cache::get_json(self.cache.as_ref(), document.as_str()).await?;
        if cached.is_some() {
            debug!("Document {} already cached, skipping fetch", document);
            return Ok(());
        }

        let benefits = self.provider.fetch_benefits(document).await?;
        let dataset = BenefitDataset {
            document_id: document.clone(),
            benefits,
        };

        self.index.upsert(&dataset).await?;
        cache::set_json(self.cache.as_ref(), document.as_str(), &dataset, self.cache_ttl).await?;

        Ok(())
    }
}
