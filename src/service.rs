//! Deal service: the orchestrators behind the four public operations.
//!
//! Each operation walks the same pipeline: cache read (unless bypassed) →
//! fast-path match (free-text search only) → query build → model gateway →
//! per-item URL resolution → cache write. The cache store and the model are
//! injected capabilities, so the whole pipeline is testable with an
//! in-memory cache and a recorded gateway.
//!
//! # Error normalization
//!
//! Callers see exactly three outcomes: a populated list, an empty list, or
//! [`DealError::RateLimited`]. Malformed model output, transport failures,
//! and cache faults all collapse into the empty list (logged at warn); only
//! rate limiting survives the trip up, so the caller can render a distinct
//! "wait and retry" state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::fastpath;
use crate::gateway::{DealModel, GatewayError, ModelResponse};
use crate::models::{PreOwnedListing, ProductListing, ProductLink, TrendingListing, VisionSearchResult};
use crate::query;
use crate::resolver;

/// The only failure a caller has to handle. Everything else is an empty
/// list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DealError {
    /// The model provider reported quota exhaustion or throttling.
    /// Retrying immediately will not help; surface a wait state.
    #[error("model provider rate limit exceeded")]
    RateLimited,
}

pub struct DealService {
    config: Config,
    cache: Arc<dyn CacheStore>,
    model: Arc<dyn DealModel>,
}

impl DealService {
    pub fn new(config: Config, cache: Arc<dyn CacheStore>, model: Arc<dyn DealModel>) -> Self {
        Self {
            config,
            cache,
            model,
        }
    }

    /// Free-text (or pasted-URL) product search, keyed on query + currency.
    pub async fn search_by_text(
        &self,
        search_query: &str,
        currency: &str,
    ) -> Result<Vec<ProductListing>, DealError> {
        let key = format!("search_{}_{}", search_query, currency);

        if let Some(listings) = self.read_cached::<ProductListing>(&key).await {
            return Ok(listings);
        }

        if let Some(listings) = fastpath::match_query(search_query) {
            debug!(query = search_query, "fast-path hit");
            self.write_cache(&key, &listings).await;
            return Ok(listings);
        }

        let plan = query::text_search_plan(search_query, currency);
        let response = match self.generate(&plan, "text search").await? {
            Some(response) => response,
            None => return Ok(Vec::new()),
        };

        let mut listings: Vec<ProductListing> = parse_or_empty(&response.text);
        resolve_links(&mut listings, &response, &self.config);

        if !listings.is_empty() {
            self.write_cache(&key, &listings).await;
        }
        Ok(listings)
    }

    /// Image search. Never cached: the image bytes are not part of a
    /// stable key and matches are one-off.
    pub async fn search_by_image(
        &self,
        image: &[u8],
        mime_type: &str,
        currency: &str,
    ) -> Result<VisionSearchResult, DealError> {
        let plan = query::vision_search_plan(image, mime_type, currency);
        let response = match self.generate(&plan, "vision search").await? {
            Some(response) => response,
            None => return Ok(VisionSearchResult::default()),
        };

        let mut result: VisionSearchResult =
            serde_json::from_str(&response.text).unwrap_or_else(|e| {
                warn!(error = %e, "discarding malformed vision response");
                VisionSearchResult::default()
            });
        resolve_links(&mut result.products, &response, &self.config);

        Ok(result)
    }

    /// Trending deals, one shared slot per currency.
    pub async fn trending_deals(
        &self,
        currency: &str,
        bypass_cache: bool,
    ) -> Result<Vec<TrendingListing>, DealError> {
        let key = format!("trending_{}", currency);

        if !bypass_cache {
            if let Some(listings) = self.read_cached::<TrendingListing>(&key).await {
                return Ok(listings);
            }
        }

        let plan = query::trending_plan(currency);
        let response = match self.generate(&plan, "trending deals").await? {
            Some(response) => response,
            None => return Ok(Vec::new()),
        };

        let mut listings: Vec<TrendingListing> = parse_or_empty(&response.text);
        resolve_links(&mut listings, &response, &self.config);

        if !listings.is_empty() {
            self.write_cache(&key, &listings).await;
        }
        Ok(listings)
    }

    /// Pre-owned deals, one shared slot per currency.
    pub async fn pre_owned_deals(
        &self,
        currency: &str,
        bypass_cache: bool,
    ) -> Result<Vec<PreOwnedListing>, DealError> {
        let key = format!("preowned_{}", currency);

        if !bypass_cache {
            if let Some(listings) = self.read_cached::<PreOwnedListing>(&key).await {
                return Ok(listings);
            }
        }

        let plan = query::pre_owned_plan(currency);
        let response = match self.generate(&plan, "pre-owned deals").await? {
            Some(response) => response,
            None => return Ok(Vec::new()),
        };

        let mut listings: Vec<PreOwnedListing> = parse_or_empty(&response.text);
        resolve_links(&mut listings, &response, &self.config);

        if !listings.is_empty() {
            self.write_cache(&key, &listings).await;
        }
        Ok(listings)
    }

    /// Call the model. `Ok(None)` is the normalized "treat as no results"
    /// outcome for every failure except rate limiting.
    async fn generate(
        &self,
        plan: &query::QueryPlan,
        operation: &str,
    ) -> Result<Option<ModelResponse>, DealError> {
        match self.model.generate(plan).await {
            Ok(response) => Ok(Some(response)),
            Err(GatewayError::RateLimited) => Err(DealError::RateLimited),
            Err(e) => {
                warn!(operation, error = %e, "model call failed, returning no results");
                Ok(None)
            }
        }
    }

    /// Read a fresh, well-formed, non-empty cached list. Anything else is
    /// a miss.
    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let value = self.cache.get(key).await?;
        match serde_json::from_value::<Vec<T>>(value) {
            Ok(listings) if !listings.is_empty() => {
                debug!(key, "serving cached listings");
                Some(listings)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(key, error = %e, "cached entry no longer parses, refetching");
                None
            }
        }
    }

    async fn write_cache<T: Serialize>(&self, key: &str, listings: &[T]) {
        match serde_json::to_value(listings) {
            Ok(value) => self.cache.set(key, value).await,
            Err(e) => warn!(key, error = %e, "skipping cache write"),
        }
    }
}

/// Run every listing's claimed URL through the resolver against the
/// response's grounding candidates.
fn resolve_links<T: ProductLink>(items: &mut [T], response: &ModelResponse, config: &Config) {
    for item in items {
        let resolved = resolver::resolve(
            item.product_url(),
            &response.candidates,
            item.title(),
            item.platform(),
            &config.resolver,
        );
        item.set_product_url(resolved);
    }
}

/// Parse the model's JSON text, degrading a parse failure to "no deals
/// found" instead of surfacing it.
fn parse_or_empty<T: DeserializeOwned>(text: &str) -> Vec<T> {
    match serde_json::from_str(text) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "discarding malformed model response");
            Vec::new()
        }
    }
}
