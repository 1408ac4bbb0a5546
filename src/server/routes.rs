//! HTTP routes.
//!
//! Submission is fire-and-forget: the caller learns only whether the batch
//! was accepted onto the queue, never per-document results. The read path
//! consults the search index directly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::state::ServerState;
use crate::error::IngestError;
use crate::models::DocumentId;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProcessDocumentsBody {
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessDocumentsResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// PUT /process-documents - validate a batch and enqueue one job per document.
async fn process_documents(
    State(state): State<ServerState>,
    Json(body): Json<ProcessDocumentsBody>,
) -> impl IntoResponse {
    match state.submitter.submit(&body.documents) {
        Ok(count) => {
            info!("Accepted batch of {} documents for processing", count);
            (StatusCode::OK, Json(ProcessDocumentsResponse { success: true }))
        }
        Err(IngestError::Validation(reason)) => {
            warn!("Rejected document batch: {}", reason);
            (
                StatusCode::BAD_REQUEST,
                Json(ProcessDocumentsResponse { success: false }),
            )
        }
        Err(err) => {
            // The caller only needs to know whether to retry the submission.
            warn!("Failed to enqueue document batch: {}", err);
            (StatusCode::OK, Json(ProcessDocumentsResponse { success: false }))
        }
    }
}

/// GET /consult-benefits/{document} - read the indexed dataset for a document.
async fn consult_benefits(
    State(state): State<ServerState>,
    Path(document): Path<String>,
) -> impl IntoResponse {
    let document = match DocumentId::parse(&document) {
        Ok(document) => document,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.index.lookup(&document).await {
        // Only the first match is canonical: upserts are keyed by document
        // id, so more than one hit never happens in practice.
        Ok(datasets) => match datasets.into_iter().next() {
            Some(dataset) => Json(dataset).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!(
                        "Benefits not found for document {}. Try processing it first or wait for processing to finish.",
                        document
                    ),
                }),
            )
                .into_response(),
        },
        Err(err) => {
            warn!("Index lookup failed for document {}: {}", document, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "search index unavailable".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/process-documents", put(process_documents))
        .route("/consult-benefits/{document}", get(consult_benefits))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BenefitDataset, BenefitRecord};
    use crate::queue::{JobQueueStore, SqliteJobQueueStore};
    use crate::search_index::MockSearchIndex;
    use crate::submission::Submitter;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn dataset() -> BenefitDataset {
        BenefitDataset {
            document_id: DocumentId::parse("12345678901").unwrap(),
            benefits: vec![BenefitRecord {
                number: "1234567".to_string(),
                code: "87".to_string(),
            }],
        }
    }

    fn make_app(queue: Arc<SqliteJobQueueStore>, index: MockSearchIndex) -> Router {
        let state = ServerState::new(Arc::new(Submitter::new(queue)), Arc::new(index));
        router(state)
    }

    fn put_documents(documents: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri("/process-documents")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "documents": documents }).to_string(),
            ))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_process_documents_accepts_valid_batch() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let app = make_app(queue.clone(), MockSearchIndex::new());

        let response = app
            .oneshot(put_documents(serde_json::json!([
                "12345678901",
                "98765432109"
            ])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "success": true }));
        assert_eq!(queue.pending_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_process_documents_rejects_invalid_batch() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let app = make_app(queue.clone(), MockSearchIndex::new());

        let response = app
            .oneshot(put_documents(serde_json::json!(["123", "456"])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, serde_json::json!({ "success": false }));
        assert_eq!(queue.pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_process_documents_rejects_empty_batch() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let app = make_app(queue, MockSearchIndex::new());

        let response = app
            .oneshot(put_documents(serde_json::json!([])))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_consult_benefits_returns_first_match() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let mut index = MockSearchIndex::new();
        index
            .expect_lookup()
            .withf(|document| document.as_str() == "12345678901")
            .returning(|_| Ok(vec![dataset()]));

        let app = make_app(queue, index);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/consult-benefits/12345678901")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::to_value(dataset()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_consult_benefits_not_found() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let mut index = MockSearchIndex::new();
        index.expect_lookup().returning(|_| Ok(Vec::new()));

        let app = make_app(queue, index);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/consult-benefits/12345678901")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_consult_benefits_invalid_document() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let mut index = MockSearchIndex::new();
        index.expect_lookup().never();

        let app = make_app(queue, index);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/consult-benefits/123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_consult_benefits_index_error_is_500() {
        let queue = Arc::new(SqliteJobQueueStore::in_memory().unwrap());
        let mut index = MockSearchIndex::new();
        index
            .expect_lookup()
            .returning(|_| Err(IngestError::store(anyhow::anyhow!("es down"))));

        let app = make_app(queue, index);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/consult-benefits/12345678901")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
