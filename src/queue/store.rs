//! Queue storage and persistence.
//!
//! SQLite-backed storage for ingestion jobs. State machine per job:
//! PENDING -> IN_PROGRESS -> DONE | FAILED, with stale IN_PROGRESS jobs
//! promoted back to PENDING for redelivery.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::models::DocumentId;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ingest_jobs (
    id TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    finished_at INTEGER,
    error TEXT
);
CREATE INDEX IF NOT EXISTS idx_ingest_jobs_status ON ingest_jobs (status, created_at);
"#;

/// Status of a job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "IN_PROGRESS" => JobStatus::InProgress,
            "DONE" => JobStatus::Done,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

/// One unit of ingestion work: a single document to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueJob {
    /// Unique identifier (UUID).
    pub id: String,
    /// The document to process.
    pub document: DocumentId,
    /// When the job was enqueued (Unix timestamp).
    pub created_at: i64,
}

impl QueueJob {
    pub fn new(document: DocumentId) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A job together with its stored state, for inspection and tests.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job: QueueJob,
    pub status: JobStatus,
    pub error: Option<String>,
}

/// Trait for ingestion queue storage operations.
#[cfg_attr(test, mockall::automock)]
pub trait JobQueueStore: Send + Sync {
    /// Add a new pending job.
    fn enqueue(&self, job: QueueJob) -> Result<()>;

    /// Atomically claim the oldest pending job (PENDING -> IN_PROGRESS).
    fn claim_next(&self) -> Result<Option<QueueJob>>;

    /// Mark a claimed job as successfully completed.
    fn mark_done(&self, id: &str) -> Result<()>;

    /// Mark a claimed job as failed with its error message. Failed jobs are
    /// terminal; they are not redelivered.
    fn mark_failed(&self, id: &str, error: &str) -> Result<()>;

    /// Promote IN_PROGRESS jobs older than the threshold back to PENDING.
    /// Returns the number of jobs requeued.
    fn requeue_stale(&self, stale_threshold_secs: i64) -> Result<usize>;

    /// Number of pending jobs.
    fn pending_count(&self) -> Result<usize>;

    /// Fetch a job with its stored state.
    fn get_job(&self, id: &str) -> Result<Option<JobRecord>>;
}

/// SQLite-backed job queue store.
pub struct SqliteJobQueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJobQueueStore {
    /// Open an existing queue database or create a new one.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let existed = db_path.as_ref().exists();
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open queue database at {:?}", db_path.as_ref()))?;
        conn.execute_batch(SCHEMA)?;
        if !existed {
            info!("Created new queue database at {:?}", db_path.as_ref());
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<QueueJob> {
        // Documents are validated before enqueue, so a stored value that no
        // longer parses indicates external tampering with the queue db.
        let raw: String = row.get("document")?;
        let document = DocumentId::parse(&raw).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())),
            )
        })?;
        Ok(QueueJob {
            id: row.get("id")?,
            document,
            created_at: row.get("created_at")?,
        })
    }
}

impl JobQueueStore for SqliteJobQueueStore {
    fn enqueue(&self, job: QueueJob) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ingest_jobs (id, document, status, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                job.id,
                job.document.as_str(),
                JobStatus::Pending.as_db_str(),
                job.created_at,
            ],
        )?;
        Ok(())
    }

    fn claim_next(&self) -> Result<Option<QueueJob>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"UPDATE ingest_jobs
               SET status = 'IN_PROGRESS', started_at = ?1
               WHERE id = (
                   SELECT id FROM ingest_jobs
                   WHERE status = 'PENDING'
                   ORDER BY created_at ASC, id ASC
                   LIMIT 1
               )
               RETURNING id, document, created_at"#,
        )?;

        let job = stmt
            .query_row([Self::now()], Self::row_to_job)
            .optional()?;

        Ok(job)
    }

    fn mark_done(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE ingest_jobs SET status = 'DONE', finished_at = ?1, error = NULL WHERE id = ?2",
            rusqlite::params![Self::now(), id],
        )?;
        Ok(())
    }

    fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE ingest_jobs SET status = 'FAILED', finished_at = ?1, error = ?2 WHERE id = ?3",
            rusqlite::params![Self::now(), error, id],
        )?;
        Ok(())
    }

    fn requeue_stale(&self, stale_threshold_secs: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let cutoff = Self::now() - stale_threshold_secs;
        let count = conn.execute(
            r#"UPDATE ingest_jobs
               SET status = 'PENDING', started_at = NULL
               WHERE status = 'IN_PROGRESS' AND started_at <= ?1"#,
            [cutoff],
        )?;
        Ok(count)
    }

    fn pending_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ingest_jobs WHERE status = 'PENDING'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, document, status, created_at, error FROM ingest_jobs WHERE id = ?1",
        )?;
        let record = stmt
            .query_row([id], |row| {
                let job = Self::row_to_job(row)?;
                let status: String = row.get("status")?;
                Ok(JobRecord {
                    job,
                    status: JobStatus::from_db_str(&status),
                    error: row.get("error")?,
                })
            })
            .optional()?;
        Ok(record)
    }
}
