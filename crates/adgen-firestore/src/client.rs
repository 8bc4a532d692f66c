//! Firestore REST API client.
//!
//! Token caching with refresh margin, HTTP client tuning, and bounded retry
//! around retryable failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{FirestoreError, FirestoreResult};
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::TokenCache;
use crate::types::{Document, ListDocumentsResponse, Value};

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID").map_err(|_| {
            FirestoreError::auth_error("GCP_PROJECT_ID must be set to access Firestore")
        })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error("GCP_PROJECT_ID cannot be empty"));
        }

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Firestore REST API client.
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = Self::create_auth_provider()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("adgen-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(TokenCache::new(auth)),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    async fn get_token(&self) -> FirestoreResult<String> {
        self.token_cache.get_token().await
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }

    /// Get a document.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        with_retry(&self.config.retry, "get_document", || async {
            let mut token = self.get_token().await?;
            let mut response = self.http.get(&url).bearer_auth(&token).send().await?;
            let mut status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                let body = response.text().await.unwrap_or_default();
                if Self::is_access_token_expired(&body) {
                    self.token_cache.invalidate().await;
                    token = self.get_token().await?;
                    response = self.http.get(&url).bearer_auth(&token).send().await?;
                    status = response.status();
                } else {
                    return Err(FirestoreError::from_http_status(
                        status.as_u16(),
                        format!("{} failed: {}", url, body),
                    ));
                }
            }

            match status {
                StatusCode::OK => {
                    let doc: Document = response.json().await?;
                    Ok(Some(doc))
                }
                StatusCode::NOT_FOUND => Ok(None),
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create or replace a document (upsert via PATCH without a mask).
    pub async fn upsert_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = self.document_path(collection, doc_id);
        let body = Document::new(fields);

        debug!("Upserting document {}/{}", collection, doc_id);

        with_retry(&self.config.retry, "upsert_document", || async {
            let mut token = self.get_token().await?;
            let mut response = self
                .http
                .patch(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;
            let mut status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                let body_text = response.text().await.unwrap_or_default();
                if Self::is_access_token_expired(&body_text) {
                    self.token_cache.invalidate().await;
                    token = self.get_token().await?;
                    response = self
                        .http
                        .patch(&url)
                        .bearer_auth(&token)
                        .json(&body)
                        .send()
                        .await?;
                    status = response.status();
                } else {
                    return Err(FirestoreError::from_http_status(
                        status.as_u16(),
                        format!("{} failed: {}", url, body_text),
                    ));
                }
            }

            match status {
                StatusCode::OK => {
                    let doc: Document = response.json().await?;
                    Ok(doc)
                }
                _ => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// List documents in a collection, newest pages first left to the caller.
    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: u32,
    ) -> FirestoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/{}?pageSize={}", self.base_url, collection, page_size);
            if let Some(ref token) = page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let page: ListDocumentsResponse =
                with_retry(&self.config.retry, "list_documents", || {
                    let url = url.clone();
                    async move {
                        let token = self.get_token().await?;
                        let response = self.http.get(&url).bearer_auth(&token).send().await?;
                        let status = response.status();

                        match status {
                            StatusCode::OK => Ok(response.json().await?),
                            _ => Err(Self::handle_error_response(status, &url, response).await),
                        }
                    }
                })
                .await?;

            if let Some(docs) = page.documents {
                documents.extend(docs);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }
}
