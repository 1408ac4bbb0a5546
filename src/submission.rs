//! Submission path: batch validation and enqueueing.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::IngestError;
use crate::models::DocumentId;
use crate::queue::{JobQueueStore, QueueJob};

/// Accepts batches of raw document strings and turns them into queue jobs,
/// one job per document. Validation is all-or-nothing: a single malformed
/// entry (or an empty batch) rejects the whole submission before anything
/// is enqueued.
pub struct Submitter {
    queue: Arc<dyn JobQueueStore>,
}

impl Submitter {
    pub fn new(queue: Arc<dyn JobQueueStore>) -> Self {
        Self { queue }
    }

    /// Validate, normalize and enqueue a batch. Returns the number of jobs
    /// enqueued.
    pub fn submit(&self, raw_documents: &[String]) -> Result<usize, IngestError> {
        let documents = DocumentId::parse_batch(raw_documents)?;
        let count = documents.len();

        for document in documents {
            self.queue
                .enqueue(QueueJob::new(document))
                .map_err(|err| {
                    error!("Failed to enqueue document job: {}", err);
                    IngestError::Store(err)
                })?;
        }

        info!("Enqueued {} document jobs", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{MockJobQueueStore, SqliteJobQueueStore};

    #[test]
    fn test_submit_enqueues_one_job_per_document() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let submitter = Submitter::new(queue.clone());

        let raw = vec!["12345678901".to_string(), "98765432109".to_string()];
        assert_eq!(submitter.submit(&raw).unwrap(), 2);
        assert_eq!(queue.pending_count().unwrap(), 2);

        let first = queue.claim_next().unwrap().unwrap();
        let second = queue.claim_next().unwrap().unwrap();
        assert_eq!(first.document.as_str(), "12345678901");
        assert_eq!(second.document.as_str(), "98765432109");
    }

    #[test]
    fn test_submit_normalizes_before_enqueue() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let submitter = Submitter::new(queue.clone());

        submitter.submit(&["123.456.789-01".to_string()]).unwrap();
        let job = queue.claim_next().unwrap().unwrap();
        assert_eq!(job.document.as_str(), "12345678901");
    }

    #[test]
    fn test_invalid_entry_rejects_whole_batch() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let submitter = Submitter::new(queue.clone());

        let raw = vec!["123".to_string(), "456".to_string()];
        let err = submitter.submit(&raw).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert_eq!(queue.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_mixed_batch_enqueues_nothing() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let submitter = Submitter::new(queue.clone());

        let raw = vec!["12345678901".to_string(), "456".to_string()];
        assert!(submitter.submit(&raw).is_err());
        assert_eq!(queue.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let submitter = Submitter::new(queue);
        assert!(submitter.submit(&[]).is_err());
    }

    #[test]
    fn test_enqueue_failure_surfaces_as_store_error() {
        let mut queue = MockJobQueueStore::new();
        queue
            .expect_enqueue()
            .returning(|_| Err(anyhow::anyhow!("queue unavailable")));

        let submitter = Submitter::new(Arc::new(queue));
        let err = submitter.submit(&["12345678901".to_string()]).unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
    }
}
