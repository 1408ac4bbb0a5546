//! Search index gateway for benefit datasets.
//!
//! Thin layer over the Elasticsearch REST API with two operations: an
//! idempotent upsert keyed by document id (full-document replace) and a
//! lookup by document id.

use async_trait::async_trait;
use tracing::debug;

use crate::error::IngestError;
use crate::models::{BenefitDataset, DocumentId};

/// Storage collaborator holding indexed benefit datasets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create-or-replace the dataset under its document id. Repeated calls
    /// overwrite prior content entirely.
    async fn upsert(&self, dataset: &BenefitDataset) -> Result<(), IngestError>;

    /// All indexed datasets for a document.
    ///
    /// Returns an empty collection when the index itself does not exist yet:
    /// on a cold start that is indistinguishable from "no data yet", so the
    /// absent-index condition is swallowed here rather than propagated.
    async fn lookup(&self, document: &DocumentId) -> Result<Vec<BenefitDataset>, IngestError>;
}

mod es {
    use serde::Deserialize;

    use crate::models::BenefitDataset;

    #[derive(Debug, Deserialize)]
    pub(super) struct SearchResponse {
        pub hits: HitsEnvelope,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct HitsEnvelope {
        pub hits: Vec<Hit>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Hit {
        #[serde(rename = "_source")]
        pub source: BenefitDataset,
    }
}

/// Elasticsearch-backed [`SearchIndex`].
pub struct EsSearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl EsSearchIndex {
    /// Create a gateway for the given node URL and index name.
    pub fn new(base_url: &str, index: &str, timeout_secs: u64) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }
}

#[async_trait]
impl SearchIndex for EsSearchIndex {
    async fn upsert(&self, dataset: &BenefitDataset) -> Result<(), IngestError> {
        let url = format!(
            "{}/{}/_doc/{}",
            self.base_url, self.index, dataset.document_id
        );
        let response = self
            .client
            .put(&url)
            .json(dataset)
            .send()
            .await
            .map_err(IngestError::store)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::store(anyhow::anyhow!(
                "index upsert for document {} failed with status {}",
                dataset.document_id,
                status
            )));
        }
        Ok(())
    }

    async fn lookup(&self, document: &DocumentId) -> Result<Vec<BenefitDataset>, IngestError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let query = serde_json::json!({
            "query": { "match": { "document_id": document.as_str() } }
        });

        let response = self
            .client
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(IngestError::store)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(
                "Search index '{}' does not exist yet, treating lookup as empty",
                self.index
            );
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(IngestError::store(anyhow::anyhow!(
                "index lookup for document {} failed with status {}",
                document,
                status
            )));
        }

        let body: es::SearchResponse = response.json().await.map_err(IngestError::store)?;
        Ok(body.hits.hits.into_iter().map(|hit| hit.source).collect())
    }
}
