// REST client for the hosted document database, exposed as a DocumentStore.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use clubrecord_core::config::Config;
use clubrecord_core::model::{MatchRecord, PlayerDocument, PlayerStats, Year};
use clubrecord_core::store::{DocumentStore, StoreError};

use crate::value::{Document, ListDocumentsResponse};

/// Public endpoint used when no `base_url` is configured.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

const MAX_BACKOFF: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

// ---------------------------------------------------------------------------
// FirestoreStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: reqwest::Client,
    /// `{base}/v1/projects/{project}/databases/{database}/documents`
    documents_url: Url,
    api_key: Option<String>,
    page_size: u32,
    retry: RetryPolicy,
}

impl FirestoreStore {
    pub fn new(
        base_url: &str,
        project_id: &str,
        database: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut documents_url = Url::parse(base_url).map_err(|e| StoreError::Malformed {
            message: format!("invalid base url `{base_url}`: {e}"),
        })?;
        documents_url
            .path_segments_mut()
            .map_err(|_| StoreError::Malformed {
                message: format!("base url `{base_url}` cannot carry a path"),
            })?
            .pop_if_empty()
            .extend(["v1", "projects", project_id, "databases", database, "documents"]);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network {
                url: base_url.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            documents_url,
            api_key: None,
            page_size: 300,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build from the `[store]` section and credentials.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store = &config.store;
        let base_url = store.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let client = Self::new(
            base_url,
            &store.project_id,
            &store.database,
            Duration::from_secs(store.timeout_secs),
        )?
        .with_api_key(config.credentials.api_key.clone())
        .with_page_size(store.page_size)
        .with_retry(RetryPolicy {
            attempts: store.retry_attempts.max(1),
            base_delay: Duration::from_millis(store.retry_backoff_ms),
        });
        info!(
            endpoint = %client.documents_url,
            authenticated = client.api_key.is_some(),
            "document store client ready"
        );
        Ok(client)
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.documents_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        url
    }

    // -----------------------------------------------------------------------
    // HTTP
    // -----------------------------------------------------------------------

    /// One GET. `Ok(None)` on 404. Errors name the path only, so the API key
    /// never reaches logs.
    async fn fetch_once(&self, url: &Url) -> Result<Option<Value>, StoreError> {
        let path = url.path().to_string();
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| StoreError::Network {
                url: path.clone(),
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                url: path,
                status: status.as_u16(),
            });
        }
        response.json::<Value>().await.map(Some).map_err(|e| StoreError::Decode {
            context: path,
            message: e.without_url().to_string(),
        })
    }

    /// GET with retry on transient failures.
    async fn fetch(&self, url: &Url) -> Result<Option<Value>, StoreError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry.attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        path = url.path(),
                        attempt,
                        max_attempts = self.retry.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient document store error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Every document of a top-level collection, following page tokens.
    async fn list_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let mut url = self.url_for(&[collection]);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &self.page_size.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let Some(body) = self.fetch(&url).await? else {
                debug!(collection, "collection not found, treating as empty");
                break;
            };
            let page: ListDocumentsResponse = decode(body, collection)?;
            pages += 1;
            documents.extend(page.documents);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    warn!(collection, pages, "page token repeated, stopping listing");
                    break;
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(collection, pages, documents = documents.len(), "listed collection");
        Ok(documents)
    }
}

fn decode<T: DeserializeOwned>(body: Value, context: &str) -> Result<T, StoreError> {
    serde_json::from_value(body).map_err(|e| StoreError::Decode {
        context: context.to_string(),
        message: e.to_string(),
    })
}

/// Decode one listed document into `T`, with its document id injected as
/// `id`. Malformed documents are skipped with a warning.
fn decode_documents<T: DeserializeOwned>(documents: Vec<Document>, collection: &str) -> Vec<T> {
    let total = documents.len();
    let decoded: Vec<T> = documents
        .into_iter()
        .filter_map(|doc| {
            let result = doc.to_plain().and_then(|mut plain| {
                if let Value::Object(map) = &mut plain {
                    map.insert("id".into(), Value::String(doc.id().to_string()));
                }
                decode::<T>(plain, collection)
            });
            match result {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(collection, document = doc.id(), error = %e, "skipping malformed document");
                    None
                }
            }
        })
        .collect();
    if decoded.len() < total {
        warn!(collection, skipped = total - decoded.len(), "some documents could not be decoded");
    }
    decoded
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn players(&self) -> Result<Vec<PlayerDocument>, StoreError> {
        let documents = self.list_collection("players").await?;
        Ok(decode_documents(documents, "players"))
    }

    async fn player_history(
        &self,
        player_id: &str,
        year: Year,
    ) -> Result<Option<PlayerStats>, StoreError> {
        let year = year.to_string();
        let url = self.url_for(&["players", player_id, "history", &year]);
        let Some(body) = self.fetch(&url).await? else {
            return Ok(None);
        };
        let context = format!("players/{player_id}/history/{year}");
        let document: Document = decode(body, &context)?;
        decode(document.to_plain()?, &context).map(Some)
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        let documents = self.list_collection("matches").await?;
        Ok(decode_documents(documents, "matches"))
    }
}
