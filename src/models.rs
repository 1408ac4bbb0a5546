//! Core domain models for the benefit ingestion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// A normalized CPF document identifier: exactly 11 digits.
///
/// Construction goes through [`DocumentId::parse`], which strips any
/// formatting characters ("123.456.789-01" style input is accepted) and
/// rejects anything that does not end up as 11 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Normalize and validate a raw document string.
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 11 {
            return Err(IngestError::Validation(format!(
                "document '{}' must have exactly 11 digits",
                raw
            )));
        }
        Ok(Self(digits))
    }

    /// Parse a whole batch, rejecting it entirely on empty input or any
    /// invalid entry. No partial acceptance: either every document parses
    /// or the batch is refused.
    pub fn parse_batch(raw: &[String]) -> Result<Vec<Self>, IngestError> {
        if raw.is_empty() {
            return Err(IngestError::Validation(
                "documents list must not be empty".to_string(),
            ));
        }
        raw.iter().map(|doc| Self::parse(doc)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single benefit entitlement as exposed by our API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitRecord {
    /// Benefit number (provider field `numero_beneficio`).
    pub number: String,
    /// Benefit type code (provider field `codigo_tipo_beneficio`).
    pub code: String,
}

/// The unit persisted to both the search index and the cache, keyed by
/// document id. Overwritten wholesale on re-processing, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitDataset {
    pub document_id: DocumentId,
    pub benefits: Vec<BenefitRecord>,
}
