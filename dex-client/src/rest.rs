//! REST client for the upstream catalog API.

use std::time::Duration;

use async_trait::async_trait;
use dex_core::{CatalogApi, CategoryRef, DexError, DexResult, Entry, EntryPage, EntryRef};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::wire::{CategoryDirectoryResponse, CategoryResponse, DetailResponse, ListResponse};

const ENTRY_SEGMENT: &str = "pokemon";
const CATEGORY_SEGMENT: &str = "type";

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    base: Url,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> DexResult<Self> {
        config.validate()?;
        let timeout = Duration::from_millis(config.request_timeout_ms);

        let mut headers = HeaderMap::new();
        if let Some(agent) = &config.user_agent {
            let value = HeaderValue::from_str(agent).map_err(|e| DexError::Config {
                field: "user_agent",
                reason: e.to_string(),
            })?;
            headers.insert(USER_AGENT, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::from)?;

        let base_url = config.api_base_url.trim().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url).map_err(|e| DexError::Config {
            field: "api_base_url",
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute locators are used as-is; anything else is joined onto the base URL.
    pub(crate) fn resolve_url(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            locator.to_string()
        } else if locator.starts_with('/') {
            format!("{}{}", self.base_url, locator)
        } else {
            format!("{}/{}", self.base_url, locator)
        }
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let response = self.client.get(url).send().await?;
        tracing::debug!(
            method = "GET",
            url,
            status = response.status().as_u16(),
            "upstream response"
        );
        self.parse_response(url, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str::<T>(&text)?)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl CatalogApi for RestClient {
    async fn fetch_list_page(&self, limit: usize, offset: usize) -> DexResult<EntryPage> {
        let mut url = self.endpoint(&[ENTRY_SEGMENT])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        let res: ListResponse = self.get_json(url.as_str()).await?;
        Ok(res.into())
    }

    async fn fetch_detail_by_locator(&self, locator: &str) -> DexResult<Entry> {
        let url = self.resolve_url(locator);
        let res: DetailResponse = self.get_json(&url).await?;
        Ok(res.into())
    }

    async fn fetch_detail_by_name(&self, name_or_id: &str) -> DexResult<Entry> {
        let key = name_or_id.trim().to_lowercase();
        let url = self.endpoint(&[ENTRY_SEGMENT, key.as_str()])?;
        let res: DetailResponse = self.get_json(url.as_str()).await?;
        Ok(res.into())
    }

    async fn fetch_category_members(&self, category: &str) -> DexResult<Vec<EntryRef>> {
        let url = self.endpoint(&[CATEGORY_SEGMENT, category])?;
        let res: CategoryResponse = self.get_json(url.as_str()).await?;
        Ok(res.into())
    }

    async fn fetch_categories(&self) -> DexResult<Vec<CategoryRef>> {
        let url = self.endpoint(&[CATEGORY_SEGMENT])?;
        let res: CategoryDirectoryResponse = self.get_json(url.as_str()).await?;
        Ok(res.into())
    }
}
