use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Entry lifetime in seconds. Entries older than this are logically
    /// absent at read time; there is no background eviction.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/deals.sqlite")
}
fn default_ttl_secs() -> u64 {
    120
}

impl CacheConfig {
    pub fn ttl_ms(&self) -> i64 {
        (self.ttl_secs as i64) * 1000
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Tunables for the URL resolution heuristic.
///
/// The weights and marker tables are data, not code: they can be retuned or
/// extended to new platforms from the config file without touching the
/// scoring logic. The defaults are the values the heuristic shipped with;
/// change them only with a test corpus that justifies it.
#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    /// Bonus when the URL contains the listing's platform name.
    #[serde(default = "default_platform_match")]
    pub platform_match: i32,
    /// Bonus when the URL has a product deep-link shape.
    #[serde(default = "default_deep_link")]
    pub deep_link: i32,
    /// Bonus per title keyword found in the URL.
    #[serde(default = "default_keyword_match")]
    pub keyword_match: i32,
    /// Bonus when a model-number token from the title appears in the URL.
    #[serde(default = "default_model_number")]
    pub model_number: i32,
    /// Penalty for search and category pages. Must be <= 0.
    #[serde(default = "default_search_page_penalty")]
    pub search_page_penalty: i32,
    /// Penalty when the URL names a brand the title does not. Must be <= 0
    /// and large enough to dominate every positive signal: a wrong-brand
    /// link is a worse failure than a missing link.
    #[serde(default = "default_brand_mismatch_penalty")]
    pub brand_mismatch_penalty: i32,
    /// Below this winning score the safety-net rescan kicks in.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: i32,
    /// Minimum distinct title keywords a safety-net candidate must match.
    #[serde(default = "default_safety_net_min_keywords")]
    pub safety_net_min_keywords: usize,
    /// Known brand and product-line names for mismatch detection.
    #[serde(default = "default_brands")]
    pub brands: Vec<String>,
    /// Path markers that identify a product detail page.
    #[serde(default = "default_deep_link_markers")]
    pub deep_link_markers: Vec<String>,
    /// URL shapes a deep link must not contain.
    #[serde(default = "default_deep_link_exclusions")]
    pub deep_link_exclusions: Vec<String>,
    /// URL shapes that draw the search/category-page penalty.
    #[serde(default = "default_search_page_markers")]
    pub search_page_markers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            platform_match: default_platform_match(),
            deep_link: default_deep_link(),
            keyword_match: default_keyword_match(),
            model_number: default_model_number(),
            search_page_penalty: default_search_page_penalty(),
            brand_mismatch_penalty: default_brand_mismatch_penalty(),
            confidence_floor: default_confidence_floor(),
            safety_net_min_keywords: default_safety_net_min_keywords(),
            brands: default_brands(),
            deep_link_markers: default_deep_link_markers(),
            deep_link_exclusions: default_deep_link_exclusions(),
            search_page_markers: default_search_page_markers(),
        }
    }
}

fn default_platform_match() -> i32 {
    15
}
fn default_deep_link() -> i32 {
    25
}
fn default_keyword_match() -> i32 {
    8
}
fn default_model_number() -> i32 {
    40
}
fn default_search_page_penalty() -> i32 {
    -60
}
fn default_brand_mismatch_penalty() -> i32 {
    -150
}
fn default_confidence_floor() -> i32 {
    20
}
fn default_safety_net_min_keywords() -> usize {
    2
}

fn default_brands() -> Vec<String> {
    [
        "apple", "iphone", "ipad", "macbook", "airpods", "watch", "samsung", "galaxy", "tab",
        "buds", "sony", "playstation", "ps5", "bravia", "dell", "xps", "inspiron", "alienware",
        "hp", "pavilion", "spectre", "omen", "lenovo", "thinkpad", "yoga", "legion", "asus",
        "rog", "zenbook", "vivobook", "acer", "predator", "swift", "nitro", "lg", "oled",
        "nanocell", "oneplus", "nord", "google", "pixel", "xiaomi", "redmi", "mi", "poco",
        "realme", "vivo", "oppo", "nothing", "motorola", "moto", "iqoo", "micromax", "lava",
        "nokia", "canon", "nikon", "fujifilm", "panasonic", "bose", "jbl", "marshall",
        "senheiser", "boat", "noise", "boult",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_deep_link_markers() -> Vec<String> {
    [
        "/dp/", "/p/", "/product/", "/buy-", "itm", "/pd/", "/item/", "/electronics/",
        "/mobiles/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_deep_link_exclusions() -> Vec<String> {
    [
        "/search", "/s?k=", "?q=", "/category/", "/all-products", "/list/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_search_page_markers() -> Vec<String> {
    ["/search", "/s?k=", "/category/", "?q="]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load the config file when it exists, otherwise fall back to defaults.
///
/// The binary runs fine with no config file at all; every setting has a
/// shipped default.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.cache.ttl_secs == 0 {
        anyhow::bail!("cache.ttl_secs must be > 0");
    }
    if config.gateway.timeout_secs == 0 {
        anyhow::bail!("gateway.timeout_secs must be > 0");
    }
    if config.gateway.model.is_empty() {
        anyhow::bail!("gateway.model must not be empty");
    }

    let r = &config.resolver;
    if r.search_page_penalty > 0 {
        anyhow::bail!("resolver.search_page_penalty must be <= 0");
    }
    if r.brand_mismatch_penalty > 0 {
        anyhow::bail!("resolver.brand_mismatch_penalty must be <= 0");
    }
    if r.brands.is_empty() {
        anyhow::bail!("resolver.brands must not be empty");
    }
    if r.deep_link_markers.is_empty() {
        anyhow::bail!("resolver.deep_link_markers must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.resolver.platform_match, 15);
        assert_eq!(config.resolver.brand_mismatch_penalty, -150);
        assert_eq!(config.resolver.confidence_floor, 20);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
[cache]
ttl_secs = 60

[resolver]
deep_link = 30
"#,
        )
        .unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.resolver.deep_link, 30);
        // Unset fields keep their defaults
        assert_eq!(config.resolver.keyword_match, 8);
        assert_eq!(config.gateway.timeout_secs, 30);
    }

    #[test]
    fn test_reject_positive_penalty() {
        let mut config = Config::default();
        config.resolver.brand_mismatch_penalty = 150;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_reject_zero_ttl() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(validate(&config).is_err());
    }
}
