//! External benefits provider (INSS API) integration.
//!
//! Owns the auth-token lifecycle: the token is fetched with credentials,
//! cached under a reserved key, and refreshed transparently when the
//! provider answers 401. Callers never reason about token freshness.

mod client;
mod wire;

use async_trait::async_trait;

use crate::error::IngestError;
use crate::models::{BenefitRecord, DocumentId};

pub use client::{InssApiClient, AUTH_TOKEN_CACHE_KEY};

/// Fetches the benefit entitlements for one document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenefitProvider: Send + Sync {
    async fn fetch_benefits(
        &self,
        document: &DocumentId,
    ) -> Result<Vec<BenefitRecord>, IngestError>;
}
