//! Wire types matching the provider's JSON envelopes.

use serde::{Deserialize, Serialize};

use crate::models::BenefitRecord;

#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub data: AuthData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthData {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BenefitsResponse {
    #[serde(default)]
    pub data: BenefitsData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BenefitsData {
    #[serde(default)]
    pub beneficios: Vec<RawBenefit>,
}

/// One benefit entry as the provider spells it.
#[derive(Debug, Deserialize)]
pub(crate) struct RawBenefit {
    pub numero_beneficio: String,
    pub codigo_tipo_beneficio: String,
}

impl RawBenefit {
    pub fn into_record(self) -> BenefitRecord {
        BenefitRecord {
            number: self.numero_beneficio,
            code: self.codigo_tipo_beneficio,
        }
    }
}
