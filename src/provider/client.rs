//! HTTP client for the INSS benefits API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::wire::{AuthRequest, AuthResponse, BenefitsResponse};
use super::BenefitProvider;
use crate::cache::{self, CacheStore};
use crate::config::ProviderSettings;
use crate::error::IngestError;
use crate::models::{BenefitRecord, DocumentId};

/// Reserved cache key for the provider auth token. Document keys are
/// 11-digit strings, so no collision is possible.
pub const AUTH_TOKEN_CACHE_KEY: &str = "inss-api-token";

/// Client for the INSS benefits API.
///
/// Two endpoints: a credential-based token request and a per-document
/// benefit lookup authenticated with a bearer token. The token is cached;
/// a 401 on the lookup invalidates it and retries exactly once with a
/// freshly fetched token. A second 401 is fatal, as is any other non-2xx.
pub struct InssApiClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    auth_token_path: String,
    benefits_path: String,
    token_ttl: Duration,
    cache: Arc<dyn CacheStore>,
}

impl InssApiClient {
    pub fn new(settings: &ProviderSettings, cache: Arc<dyn CacheStore>) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            auth_token_path: settings.auth_token_path.clone(),
            benefits_path: settings.benefits_path.clone(),
            token_ttl: Duration::from_secs(settings.token_ttl_secs),
            cache,
        })
    }

    /// Obtain a bearer token: cached when available, otherwise fetched with
    /// credentials and written back to the cache.
    async fn auth_token(&self) -> Result<String, IngestError> {
        if let Some(token) = cache::get_json::<String>(self.cache.as_ref(), AUTH_TOKEN_CACHE_KEY).await? {
            return Ok(token);
        }

        let url = format!("{}{}", self.base_url, self.auth_token_path);
        let response = self
            .client
            .post(&url)
            .json(&AuthRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Provider {
                status: status.as_u16(),
            });
        }

        let body: AuthResponse = response.json().await?;
        let token = body.data.token.ok_or(IngestError::Auth)?;

        cache::set_json(self.cache.as_ref(), AUTH_TOKEN_CACHE_KEY, &token, self.token_ttl).await?;
        debug!("Fetched fresh provider auth token");

        Ok(token)
    }
}

#[async_trait]
impl BenefitProvider for InssApiClient {
    async fn fetch_benefits(
        &self,
        document: &DocumentId,
    ) -> Result<Vec<BenefitRecord>, IngestError> {
        let path = self.benefits_path.replace("{cpf}", document.as_str());
        let url = format!("{}{}", self.base_url, path);

        let mut retried = false;
        loop {
            let token = self.auth_token().await?;
            let response = self.client.get(&url).bearer_auth(&token).send().await?;
            let status = response.status();

            // A cached token can be stale without having hit the cache TTL.
            // Invalidate it and retry once; retries never apply to any other
            // failure class.
            if status == StatusCode::UNAUTHORIZED && !retried {
                debug!(
                    "Provider rejected token for document {}, refreshing and retrying",
                    document
                );
                self.cache.delete(AUTH_TOKEN_CACHE_KEY).await?;
                retried = true;
                continue;
            }

            if !status.is_success() {
                return Err(IngestError::Provider {
                    status: status.as_u16(),
                });
            }

            let body: BenefitsResponse = response.json().await?;
            let benefits: Vec<BenefitRecord> = body
                .data
                .beneficios
                .into_iter()
                .map(|raw| raw.into_record())
                .collect();

            if benefits.is_empty() {
                return Err(IngestError::EmptyResult);
            }

            return Ok(benefits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings(server: &MockServer) -> ProviderSettings {
        ProviderSettings {
            base_url: server.uri(),
            username: "user".to_string(),
            password: "pass".to_string(),
            auth_token_path: "/token".to_string(),
            benefits_path: "/beneficios/{cpf}".to_string(),
            timeout_secs: 5,
            token_ttl_secs: 3600,
        }
    }

    fn make_client(server: &MockServer, cache: Arc<dyn CacheStore>) -> InssApiClient {
        InssApiClient::new(&test_settings(server), cache).unwrap()
    }

    fn document() -> DocumentId {
        DocumentId::parse("12345678901").unwrap()
    }

    fn token_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "data": { "token": token } }))
    }

    fn benefits_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "beneficios": [
                { "numero_beneficio": "1234567", "codigo_tipo_beneficio": "87" },
                { "numero_beneficio": "7654321", "codigo_tipo_beneficio": "41" }
            ]}
        }))
    }

    async fn seed_token(cache: &dyn CacheStore, token: &str) {
        cache::set_json(cache, AUTH_TOKEN_CACHE_KEY, &token.to_string(), Duration::from_secs(3600))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_benefits_maps_provider_fields() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_json(serde_json::json!({ "username": "user", "password": "pass" })))
            .respond_with(token_response("t1"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .and(header("authorization", "Bearer t1"))
            .respond_with(benefits_response())
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        let benefits = client.fetch_benefits(&document()).await.unwrap();

        assert_eq!(benefits.len(), 2);
        assert_eq!(benefits[0].number, "1234567");
        assert_eq!(benefits[0].code, "87");
        assert_eq!(benefits[1].number, "7654321");
        assert_eq!(benefits[1].code, "41");
    }

    #[tokio::test]
    async fn test_token_fetched_once_and_reused() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_response("t1"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .respond_with(benefits_response())
            .expect(2)
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        client.fetch_benefits(&document()).await.unwrap();
        client.fetch_benefits(&document()).await.unwrap();
    }

    #[tokio::test]
    async fn test_cached_token_skips_auth_endpoint() {
        let server = MockServer::start().await;
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
        seed_token(cache.as_ref(), "cached-token").await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_response("never-used"))
            .expect(0)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .and(header("authorization", "Bearer cached-token"))
            .respond_with(benefits_response())
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, cache);
        client.fetch_benefits(&document()).await.unwrap();
    }

    #[tokio::test]
    async fn test_401_refreshes_token_and_retries_once() {
        let server = MockServer::start().await;
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
        seed_token(cache.as_ref(), "stale").await;

        // Stale token gets a 401, then the fresh one succeeds: exactly three
        // outbound calls in total (401 lookup, token fetch, 200 lookup).
        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_response("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(benefits_response())
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, cache.clone());
        let benefits = client.fetch_benefits(&document()).await.unwrap();
        assert_eq!(benefits.len(), 2);

        // The fresh token replaced the stale one in the cache.
        let cached: Option<String> = cache::get_json(cache.as_ref(), AUTH_TOKEN_CACHE_KEY)
            .await
            .unwrap();
        assert_eq!(cached, Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn test_second_401_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_response("t1"))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        let err = client.fetch_benefits(&document()).await.unwrap_err();
        assert!(matches!(err, IngestError::Provider { status: 401 }));
    }

    #[tokio::test]
    async fn test_non_401_failure_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_response("t1"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        let err = client.fetch_benefits(&document()).await.unwrap_err();
        assert!(matches!(err, IngestError::Provider { status: 503 }));
    }

    #[tokio::test]
    async fn test_empty_benefits_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_response("t1"))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beneficios/12345678901"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "data": { "beneficios": [] } }),
            ))
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        let err = client.fetch_benefits(&document()).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyResult));
    }

    #[tokio::test]
    async fn test_missing_token_in_auth_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        let err = client.fetch_benefits(&document()).await.unwrap_err();
        assert!(matches!(err, IngestError::Auth));
    }

    #[tokio::test]
    async fn test_auth_endpoint_failure_status_is_recorded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = make_client(&server, Arc::new(InMemoryCacheStore::new()));
        let err = client.fetch_benefits(&document()).await.unwrap_err();
        assert!(matches!(err, IngestError::Provider { status: 503 }));
    }
}
