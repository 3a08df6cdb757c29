//! # Catalog Client
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HttpCatalogClient::fetch_product(7)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GET {base}/products/7   (reqwest, timeout from ApiConfig)             │
//! │       │                                                                 │
//! │       ├── send error ───────► Timeout | Unreachable                    │
//! │       ├── 404 ──────────────► NotFound                                 │
//! │       ├── 401/403 ──────────► Unauthorized(server text)                │
//! │       ├── other non-2xx ────► Status { status, body }                  │
//! │       ▼                                                                 │
//! │  body text                                                              │
//! │       ├── empty / "null" ───► NotFound                                 │
//! │       ├── bad JSON ─────────► Decode                                   │
//! │       ▼                                                                 │
//! │  RemoteProduct ──try_from──► Product (price in cents)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use tote_core::{Credentials, Product, ProductId};

use crate::dto::{LoginRequest, LoginResponse, RemoteProduct};
use crate::error::{ApiError, ApiResult};

/// Public demo catalog.
pub const DEFAULT_BASE_URL: &str = "https://fakestoreapi.com";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Longest error body kept in a message.
const MAX_ERROR_BODY_CHARS: usize = 200;

// =============================================================================
// Trait
// =============================================================================

/// The remote service as seen by the store.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /products`, in server order.
    async fn fetch_products(&self) -> ApiResult<Vec<Product>>;

    /// `GET /products/{id}`.
    async fn fetch_product(&self, id: ProductId) -> ApiResult<Product>;

    /// `POST /auth/login`. Returns the session token.
    async fn login(&self, credentials: &Credentials) -> ApiResult<String>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Parses and checks a base URL. Only `http` and `https` are accepted.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "'{}' must be an http(s) URL",
                base_url
            )));
        }
        Ok(ApiConfig {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// HTTP Client
// =============================================================================

/// `reqwest` implementation of [`CatalogApi`].
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    config: ApiConfig,
    http: Client,
}

impl HttpCatalogClient {
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::ClientSetup(e.to_string()))?;
        Ok(HttpCatalogClient { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `{base}/{segments...}`, keeping any path prefix of the base URL.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.config.timeout.as_secs().max(1))
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Unreachable(err.to_string())
        }
    }

    /// Reads the body of a successful response as text.
    async fn read_body(&self, response: Response) -> ApiResult<String> {
        response.text().await.map_err(|e| self.map_send_error(e))
    }

    /// Turns a non-2xx response into an error.
    async fn status_error(&self, response: Response, what: &str) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = server_message(&body);

        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(format!("{what} not found")),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = status.as_u16(), "Credentials refused");
                ApiError::Unauthorized(message)
            }
            _ => {
                error!(
                    status = status.as_u16(),
                    body = %message,
                    "Catalog request failed"
                );
                ApiError::Status {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> ApiResult<T> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(self.status_error(response, what).await);
        }

        let body = self.read_body(response).await?;
        if is_empty_body(&body) {
            return Err(ApiError::NotFound(format!("{what} not found")));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn fetch_products(&self) -> ApiResult<Vec<Product>> {
        let url = self.endpoint(&["products"])?;
        let remote: Vec<RemoteProduct> = self.get_json(url, "Product list").await?;

        let products = remote
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = products.len(), "Fetched products");
        Ok(products)
    }

    async fn fetch_product(&self, id: ProductId) -> ApiResult<Product> {
        let id_segment = id.to_string();
        let url = self.endpoint(&["products", &id_segment])?;
        let remote: RemoteProduct = self.get_json(url, &format!("Product {id}")).await?;
        Ok(Product::try_from(remote)?)
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
        let url = self.endpoint(&["auth", "login"])?;
        let body = LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        };

        debug!(url = %url, username = %credentials.username(), "POST login");
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(self.status_error(response, "Login").await);
        }

        let text = self.read_body(response).await?;
        let parsed: LoginResponse = serde_json::from_str(&text)?;
        Ok(parsed.token)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_empty_body(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty() || trimmed == "null"
}

/// Extracts a readable message: `{"message": ..}` / `{"error": ..}` when the
/// body is JSON, the raw text otherwise. Truncated.
fn server_message(body: &str) -> String {
    let text = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.to_string()),
        Ok(serde_json::Value::String(s)) => s,
        _ => body.to_string(),
    };

    let text = text.trim();
    if text.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
