//! Immich API client. The reconciliation engine only sees the [`ImmichApi`]
//! trait; [`ImmichClient`] is the `reqwest` implementation used at runtime.

pub mod error;
pub mod search;
pub mod tags;
pub mod types;

pub use error::ImmichError;
pub use types::{AssetPage, AssetResponse, ExifInfo, MetadataSearch, TagResponse};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use types::{SearchResponse, UpdateAsset};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote operations the reconciliation needs. No call is retried.
#[async_trait::async_trait]
pub trait ImmichApi: Send + Sync {
    /// One page of `POST /search/metadata`.
    async fn search_assets(&self, criteria: &MetadataSearch) -> Result<AssetPage, ImmichError>;

    /// Full asset record, including `exifInfo`.
    async fn get_asset_info(&self, id: Uuid) -> Result<AssetResponse, ImmichError>;

    /// Set `dateTimeOriginal` to the given ISO-8601 string.
    async fn update_asset(&self, id: Uuid, date_time_original: &str) -> Result<(), ImmichError>;

    async fn get_all_tags(&self) -> Result<Vec<TagResponse>, ImmichError>;
}

/// HTTP client bound to one server and API key.
pub struct ImmichClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for ImmichClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmichClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ImmichClient {
    /// `base_url` is the API root, e.g. `https://photos.example.com/api`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ImmichError> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ImmichError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("immich-tzfix-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reject non-2xx responses and decode the body as `T`.
    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: Response,
    ) -> Result<T, ImmichError> {
        let response = Self::check_status(endpoint, response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ImmichError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn check_status(endpoint: &str, response: Response) -> Result<Response, ImmichError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ImmichError::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl ImmichApi for ImmichClient {
    async fn search_assets(&self, criteria: &MetadataSearch) -> Result<AssetPage, ImmichError> {
        let endpoint = "/search/metadata";
        tracing::debug!(page = ?criteria.page, "POST {}", endpoint);
        let response = self
            .client
            .post(self.url(endpoint))
            .json(criteria)
            .send()
            .await?;
        let parsed: SearchResponse = Self::read_json(endpoint, response).await?;
        Ok(parsed.assets)
    }

    async fn get_asset_info(&self, id: Uuid) -> Result<AssetResponse, ImmichError> {
        let endpoint = format!("/assets/{id}");
        let response = self.client.get(self.url(&endpoint)).send().await?;
        Self::read_json(&endpoint, response).await
    }

    async fn update_asset(&self, id: Uuid, date_time_original: &str) -> Result<(), ImmichError> {
        let endpoint = format!("/assets/{id}");
        let response = self
            .client
            .put(self.url(&endpoint))
            .json(&UpdateAsset { date_time_original })
            .send()
            .await?;
        Self::check_status(&endpoint, response).await?;
        Ok(())
    }

    async fn get_all_tags(&self) -> Result<Vec<TagResponse>, ImmichError> {
        let endpoint = "/tags";
        let response = self.client.get(self.url(endpoint)).send().await?;
        Self::read_json(endpoint, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ImmichClient::new("https://photos.example.com/api/", "secret").unwrap();
        assert_eq!(
            client.url("/search/metadata"),
            "https://photos.example.com/api/search/metadata"
        );
    }

    #[test]
    fn test_api_key_with_newline_rejected() {
        let err = ImmichClient::new("https://photos.example.com/api", "bad\nkey").unwrap_err();
        assert!(matches!(err, ImmichError::InvalidApiKey));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let client = ImmichClient::new("https://photos.example.com/api", "secret").unwrap();
        let dbg = format!("{:?}", client);
        assert!(dbg.contains("photos.example.com"));
        assert!(!dbg.contains("secret"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let client = ImmichClient::new("http://127.0.0.1:1/api", "secret").unwrap();
        let err = client
            .search_assets(&MetadataSearch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ImmichError::Http(_)));
    }
}
