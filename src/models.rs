//! Core data models for deal listings.
//!
//! These types mirror the structured-output contract the model gateway asks
//! the model to fill, so field names serialize in camelCase. Listings are
//! constructed fresh per query response and never mutated after their
//! product URL has been resolved.

use serde::{Deserialize, Serialize};

/// A single product offer returned by free-text or vision search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub id: String,
    /// Retailer name, e.g. "Amazon", "Flipkart".
    pub platform: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Amount in the caller-specified currency; the listing carries no
    /// currency tag itself.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// After resolution this points at a specific product page, never a
    /// search or category listing.
    pub product_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_best_deal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_recommendation: Option<String>,
}

/// A trending offer. Unlike [`ProductListing`], the original price and
/// discount percentage are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingListing {
    pub id: String,
    pub platform: String,
    pub title: String,
    pub price: f64,
    pub original_price: f64,
    /// Percentage discount, 0-100.
    pub discount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub product_url: String,
}

/// A pre-owned offer. Condition score and risk level are independent
/// model-asserted signals; no invariant ties them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreOwnedListing {
    pub id: String,
    pub platform: String,
    /// Seller/platform rating out of 5.
    pub platform_rating: f64,
    pub title: String,
    pub price: f64,
    /// What the item costs new, for drop framing.
    pub new_price: f64,
    /// 0-100.
    pub condition_score: f64,
    pub risk_level: RiskLevel,
    pub worth_buying: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub product_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Result of a vision (image) search: the product the model identified in
/// the image plus listings for that specific product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionSearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_product: Option<String>,
    #[serde(default)]
    pub products: Vec<VisionMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionMatch {
    pub id: String,
    pub platform: String,
    pub title: String,
    pub price: f64,
    /// "Exact Match", "Cheaper Alternative", or "Trending".
    pub match_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub product_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Common surface of every listing variant that carries a resolvable
/// product URL. The resolver works through this trait so one pass serves
/// all listing shapes.
pub trait ProductLink {
    fn platform(&self) -> &str;
    fn title(&self) -> &str;
    fn product_url(&self) -> &str;
    fn set_product_url(&mut self, url: String);
}

macro_rules! impl_product_link {
    ($($ty:ty),+) => {
        $(impl ProductLink for $ty {
            fn platform(&self) -> &str {
                &self.platform
            }
            fn title(&self) -> &str {
                &self.title
            }
            fn product_url(&self) -> &str {
                &self.product_url
            }
            fn set_product_url(&mut self, url: String) {
                self.product_url = url;
            }
        })+
    };
}

impl_product_link!(ProductListing, TrendingListing, PreOwnedListing, VisionMatch);
