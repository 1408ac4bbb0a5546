//! Durable ingestion work queue.
//!
//! One job carries exactly one document. Delivery is at-least-once: a job
//! claimed by a worker that dies comes back after a staleness threshold,
//! and duplicate processing is tolerated because the index upsert is
//! idempotent and cached documents are skipped.

mod store;
mod worker;

pub use store::{JobQueueStore, JobRecord, JobStatus, QueueJob, SqliteJobQueueStore};
pub use worker::{IngestWorker, JobOutcome};

#[cfg(test)]
pub use store::MockJobQueueStore;
