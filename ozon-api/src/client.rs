//! HTTP transport for the Seller API
//!
//! Thin wrapper over `reqwest` that attaches the seller authorization
//! headers and guards mutating calls against non-production environments.

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::{OzonError, OzonResult};

/// Default Seller API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api-seller.ozon.ru";

/// One seller authorization token. Every request is scoped to exactly one
/// token; tokens are resolved per profile by the caller.
#[derive(Debug, Clone)]
pub struct ApiToken {
    /// Seller account identifier (`Client-Id` header)
    pub client_id: String,
    /// API key (`Api-Key` header)
    pub api_key: String,
    /// Warehouse the token operates on
    pub warehouse_id: i64,
}

/// Seller API client
///
/// Stateless between calls: the token travels with each request. `execute`
/// mirrors the production gate of the ops environment — when `false`, every
/// mutating endpoint short-circuits to a benign success so test and staging
/// runs can never write to the live marketplace.
#[derive(Debug, Clone)]
pub struct OzonClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) execute: bool,
}

impl OzonClient {
    /// Create a client against the default endpoint
    pub fn new(execute: bool) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, execute)
    }

    /// Create a client against a custom endpoint (tests, proxies)
    pub fn with_base_url(base_url: impl Into<String>, execute: bool) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            execute,
        }
    }

    /// Whether mutating calls reach the live marketplace
    pub fn is_execute(&self) -> bool {
        self.execute
    }

    /// POST a JSON body, returning the status and the parsed response body.
    ///
    /// Non-JSON bodies are mapped to an empty object so error branches can
    /// still inspect the status code.
    pub(crate) async fn post<B: Serialize + ?Sized>(
        &self,
        token: &ApiToken,
        path: &str,
        body: &B,
    ) -> OzonResult<(StatusCode, serde_json::Value)> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'));

        let response = self
            .http
            .post(&url)
            .header("Client-Id", &token.client_id)
            .header("Api-Key", &token.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let value = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Object(Default::default()));

        Ok((status, value))
    }

    /// POST returning the raw body bytes (label PDF download)
    pub(crate) async fn post_bytes<B: Serialize + ?Sized>(
        &self,
        token: &ApiToken,
        path: &str,
        body: &B,
    ) -> OzonResult<(StatusCode, Vec<u8>)> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'));

        let response = self
            .http
            .post(&url)
            .header("Client-Id", &token.client_id)
            .header("Api-Key", &token.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        Ok((status, bytes.to_vec()))
    }

    /// Plain GET of an absolute URL (label file download)
    pub async fn download(&self, url: &str) -> OzonResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(OzonError::InvalidResponse(format!(
                "download of {url} returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
