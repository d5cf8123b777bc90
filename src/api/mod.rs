//! Jikan v4 gateway.
//!
//! Every operation takes a [`CancellationToken`]. A cancelled token resolves the
//! call to [`GatewayError::Cancelled`] immediately, dropping the in-flight HTTP
//! request. Which call of a kind is current is decided by the caller (see
//! `internal::store::RequestSlot`); the gateway itself holds no per-kind state.

mod error;

pub use error::GatewayError;

use crate::config::NetworkConfig;
use crate::internal::cache::Cache;
use crate::internal::models::{Category, Envelope, Item, Page};
use crate::internal::ui::sort::SortOrder;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const JIKAN_API_BASE_URL: &str = "https://api.jikan.moe/v4";

/// Arguments of `GET /anime`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub category_ids: Vec<u32>,
    pub sort: Option<SortOrder>,
}

impl SearchParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.query.trim().to_string()),
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        if !self.category_ids.is_empty() {
            let ids: Vec<String> = self.category_ids.iter().map(u32::to_string).collect();
            pairs.push(("genres", ids.join(",")));
        }
        if let Some(sort) = self.sort {
            pairs.push(("order_by", "score".to_string()));
            pairs.push(("sort", sort.as_api_str().to_string()));
        }
        pairs
    }
}

/// HTTP service for the remote anime API.
#[derive(Clone)]
pub struct ApiService {
    client: Client,
    base_url: String,
    detail_cache: Cache<u32, Item>,
    categories_cache: Cache<(), Vec<Category>>,
    enable_metrics: bool,
}

impl ApiService {
    pub fn new(network: &NetworkConfig, enable_metrics: bool) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(network.timeout_secs))
            .user_agent(network.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build configured HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            base_url: network.base_url.trim_end_matches('/').to_string(),
            detail_cache: Cache::new(Duration::from_secs(300), enable_metrics),
            categories_cache: Cache::new(Duration::from_secs(3600), enable_metrics),
            enable_metrics,
        }
    }

    /// Service with default network settings against another host (mock servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let network = NetworkConfig {
            base_url: base_url.into(),
            ..NetworkConfig::default()
        };
        Self::new(&network, false)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        token: &CancellationToken,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        if token.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();
        let request = async {
            let resp = self.client.get(&url).query(query).send().await?;
            resp.error_for_status()?.json::<T>().await
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(url = %url, "Request cancelled");
                return Err(GatewayError::Cancelled);
            }
            result = request => result,
        };

        if self.enable_metrics {
            debug!(url = %url, elapsed = ?start.elapsed(), ok = result.is_ok(), "api.get");
        }

        result.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed");
            GatewayError::from(e)
        })
    }

    #[tracing::instrument(skip(self, token), fields(query = %params.query, page = params.page))]
    pub async fn search(
        &self,
        params: &SearchParams,
        token: &CancellationToken,
    ) -> Result<Page<Item>, GatewayError> {
        let page: Page<Item> = self
            .get_json("/anime", &params.query_pairs(), token)
            .await?;
        debug!(count = page.data.len(), has_next = page.has_next(), "Search page received");
        Ok(page)
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn detail(&self, id: u32, token: &CancellationToken) -> Result<Item, GatewayError> {
        if let Some(item) = self.detail_cache.get(&id) {
            return Ok(item);
        }

        let envelope: Envelope<Item> = self
            .get_json(&format!("/anime/{}", id), &[], token)
            .await?;
        self.detail_cache.set(id, envelope.data.clone());
        Ok(envelope.data)
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn top_items(
        &self,
        page: u32,
        page_size: u32,
        token: &CancellationToken,
    ) -> Result<Page<Item>, GatewayError> {
        let query = [("page", page.to_string()), ("limit", page_size.to_string())];
        self.get_json("/top/anime", &query, token).await
    }

    #[tracing::instrument(skip(self, token))]
    pub async fn list_categories(
        &self,
        token: &CancellationToken,
    ) -> Result<Vec<Category>, GatewayError> {
        if let Some(categories) = self.categories_cache.get(&()) {
            return Ok(categories);
        }

        let envelope: Envelope<Vec<Category>> =
            self.get_json("/genres/anime", &[], token).await?;
        info!(count = envelope.data.len(), "Loaded genre list");
        self.categories_cache.set((), envelope.data.clone());
        Ok(envelope.data)
    }
}

impl Default for ApiService {
    fn default() -> Self {
        Self::with_base_url(JIKAN_API_BASE_URL)
    }
}
