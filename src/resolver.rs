//! URL resolution: pick the best product link for a listing.
//!
//! The model's self-reported `productUrl` is often a plausible-looking but
//! wrong or dead link. Grounding candidates are URLs the underlying web
//! search actually visited, so they are more trustworthy, but many are
//! irrelevant: homepages, competitor products, category pages. Resolution
//! scores every candidate against the listing and keeps the winner.
//!
//! The heuristic is a pure function of its inputs — no randomness, no
//! network — so identical inputs always resolve to the same URL. It never
//! fails: when nothing scores well the canonicalized claimed URL comes
//! back, trading a possibly-wrong destination for availability.
//!
//! All weights, the confidence floor, and the brand/marker tables live in
//! [`ResolverConfig`]; extending the heuristic to a new platform is a
//! config change, not a code change.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::ResolverConfig;
use crate::gateway::GroundingCandidate;

static AMAZON_PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(?:dp|gp/product)/([A-Z0-9]{10})").unwrap());
static FLIPKART_ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/p/(itm[a-z0-9]{16})").unwrap());

// Model-number shapes, tried in order: "wh-1000xm5", "128gb", "s24".
static MODEL_HYPHENATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]{2,}-[a-z0-9]{2,}").unwrap());
static MODEL_DIGITS_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2,}[a-z]+").unwrap());
static MODEL_LETTERS_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]+[0-9]+").unwrap());

/// Rewrite a URL to a minimal stable form that still resolves to the same
/// product page.
///
/// Recognized platforms (matched by domain substring) have their tracking
/// query parameters stripped and their product-ID path collapsed; anything
/// unrecognized passes through unchanged, query string and all.
pub fn canonicalize(url: &str) -> String {
    let bare = url.split('?').next().unwrap_or(url);

    if bare.contains("amazon.") {
        if let Some(cap) = AMAZON_PRODUCT_ID.captures(bare) {
            let domain = if bare.contains("amazon.in") {
                "amazon.in"
            } else {
                "amazon.com"
            };
            return format!("https://www.{}/dp/{}", domain, &cap[1]);
        }
    }

    if bare.contains("flipkart.com") {
        if let Some(cap) = FLIPKART_ITEM_ID.captures(bare) {
            return format!("https://www.flipkart.com/p/{}", &cap[1]);
        }
    }

    url.to_string()
}

/// Classify a URL as a product deep link: long enough to carry a product
/// path, not a homepage or search/category listing, and containing one of
/// the configured product-path markers.
pub fn is_deep_link(url: &str, config: &ResolverConfig) -> bool {
    let u = url.to_lowercase();

    // Bare homepages
    if u.ends_with(".in") || u.ends_with(".com") || u.ends_with(".in/") || u.ends_with(".com/") {
        return false;
    }
    if config.deep_link_exclusions.iter().any(|m| u.contains(m)) {
        return false;
    }

    u.len() > 25 && config.deep_link_markers.iter().any(|m| u.contains(m))
}

/// Score a candidate URL against a listing. Higher is better; a negative
/// score means the URL is actively wrong for this listing.
pub fn score_link(url: &str, title: &str, platform: &str, config: &ResolverConfig) -> i32 {
    let u = url.to_lowercase();
    let t = title.to_lowercase();
    let p = platform.to_lowercase();

    let mut score = 0;

    if u.contains(&p) {
        score += config.platform_match;
    }

    if is_deep_link(&u, config) {
        score += config.deep_link;
    }

    let matches = title_keywords(&t).filter(|word| u.contains(word)).count();
    score += matches as i32 * config.keyword_match;

    // A model-number hit is nearly as good as a product ID.
    if let Some(token) = model_number_token(&t) {
        if u.contains(&token) {
            score += config.model_number;
        }
    }

    if config.search_page_markers.iter().any(|m| u.contains(m)) {
        score += config.search_page_penalty;
    }

    // The mismatch penalty dominates every positive signal: a wrong-brand
    // link is a worse failure than a missing link.
    if brand_mismatch(&u, &t, &config.brands) {
        score += config.brand_mismatch_penalty;
    }

    score
}

/// Select the single best URL for a listing.
///
/// The claimed URL seeds the running best; every grounding candidate is
/// scored and the highest wins, earlier candidates keeping ties. When even
/// the winner stays below the confidence floor, a safety-net rescan accepts
/// the first deep-link candidate matching enough title keywords without a
/// brand mismatch — recall over precision once the primary pass has found
/// nothing confident.
pub fn resolve(
    claimed_url: &str,
    candidates: &[GroundingCandidate],
    title: &str,
    platform: &str,
    config: &ResolverConfig,
) -> String {
    let mut best_url = claimed_url;
    let mut best_score = score_link(claimed_url, title, platform, config);

    for candidate in candidates {
        let score = score_link(&candidate.uri, title, platform, config);
        if score > best_score {
            best_score = score;
            best_url = &candidate.uri;
        }
    }

    if best_score < config.confidence_floor {
        let t = title.to_lowercase();
        for candidate in candidates {
            if !is_deep_link(&candidate.uri, config) {
                continue;
            }
            let u = candidate.uri.to_lowercase();
            let matches = title_keywords(&t).filter(|word| u.contains(word)).count();
            if matches >= config.safety_net_min_keywords && !brand_mismatch(&u, &t, &config.brands)
            {
                return canonicalize(&candidate.uri);
            }
        }
    }

    canonicalize(best_url)
}

/// Title words usable as URL evidence: split on non-alphanumerics, keep
/// words longer than two characters.
fn title_keywords(title_lower: &str) -> impl Iterator<Item = &str> {
    title_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
}

/// Extract an alphanumeric model-number token ("wh-1000xm5", "s24") from a
/// lowercased title, if any.
fn model_number_token(title_lower: &str) -> Option<String> {
    MODEL_HYPHENATED
        .find(title_lower)
        .or_else(|| MODEL_DIGITS_LETTERS.find(title_lower))
        .or_else(|| MODEL_LETTERS_DIGITS.find(title_lower))
        .map(|m| m.as_str().to_string())
}

/// True when the title names a known brand and the URL contains a different
/// known brand that the title does not also mention.
fn brand_mismatch(url_lower: &str, title_lower: &str, brands: &[String]) -> bool {
    let Some(title_brand) = brands.iter().find(|b| title_lower.contains(b.as_str())) else {
        return false;
    };

    brands.iter().any(|other| {
        other != title_brand
            && url_lower.contains(other.as_str())
            && !title_lower.contains(other.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolverConfig {
        ResolverConfig::default()
    }

    fn candidate(uri: &str) -> GroundingCandidate {
        GroundingCandidate {
            uri: uri.to_string(),
            title: None,
        }
    }

    // ─── Canonicalization ───────────────────────────────────────────

    #[test]
    fn test_canonicalize_amazon_strips_slug_and_tracking() {
        assert_eq!(
            canonicalize(
                "https://www.amazon.in/Sony-PlayStation-5-Console/dp/B0BRCP72X8?ref=sr_1_1&tag=deal"
            ),
            "https://www.amazon.in/dp/B0BRCP72X8"
        );
    }

    #[test]
    fn test_canonicalize_amazon_gp_product_path() {
        assert_eq!(
            canonicalize("https://www.amazon.com/gp/product/B0ABCDEFGH"),
            "https://www.amazon.com/dp/B0ABCDEFGH"
        );
    }

    #[test]
    fn test_canonicalize_flipkart_item_path() {
        assert_eq!(
            canonicalize(
                "https://www.flipkart.com/samsung-galaxy-s24-5g/p/itm6ac9f5f19f42bdef?pid=MOB123"
            ),
            "https://www.flipkart.com/p/itm6ac9f5f19f42bdef"
        );
    }

    #[test]
    fn test_canonicalize_unrecognized_platform_passes_through() {
        let url = "https://www.croma.com/gaming-console/c/301178?utm_source=deals";
        assert_eq!(canonicalize(url), url);
    }

    #[test]
    fn test_canonicalize_amazon_without_product_id_passes_through() {
        let url = "https://www.amazon.in/s?k=ps5";
        assert_eq!(canonicalize(url), url);
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let urls = [
            "https://www.amazon.in/Sony-PlayStation-5-Console/dp/B0BRCP72X8?tag=x",
            "https://www.flipkart.com/samsung-galaxy-s24-5g/p/itm6ac9f5f19f42bdef",
            "https://www.croma.com/gaming-console/c/301178",
        ];
        for url in urls {
            let once = canonicalize(url);
            assert_eq!(canonicalize(&once), once, "not idempotent for {}", url);
        }
    }

    // ─── Deep-link classification ───────────────────────────────────

    #[test]
    fn test_deep_link_product_page() {
        assert!(is_deep_link(
            "https://www.amazon.in/Some-Name/dp/B0ABCDEFGH",
            &config()
        ));
    }

    #[test]
    fn test_deep_link_rejects_search_page() {
        assert!(!is_deep_link("https://www.amazon.in/s?k=phone", &config()));
    }

    #[test]
    fn test_deep_link_rejects_category_page() {
        assert!(!is_deep_link(
            "https://www.flipkart.com/category/mobiles",
            &config()
        ));
    }

    #[test]
    fn test_deep_link_rejects_homepage() {
        assert!(!is_deep_link("https://www.amazon.in", &config()));
        assert!(!is_deep_link("https://www.flipkart.com/", &config()));
    }

    #[test]
    fn test_deep_link_rejects_short_urls() {
        // Has a marker but not enough path to name a product.
        assert!(!is_deep_link("https://ex.com/p/1", &config()));
    }

    // ─── Scoring ────────────────────────────────────────────────────

    #[test]
    fn test_score_platform_bonus() {
        let cfg = config();
        let with = score_link(
            "https://www.amazon.in/gadget-zone/led-desk-lamps",
            "LED Desk Lamp",
            "Amazon",
            &cfg,
        );
        let without = score_link(
            "https://www.shopsy.in/gadget-zone/led-desk-lamps",
            "LED Desk Lamp",
            "Amazon",
            &cfg,
        );
        assert_eq!(with - without, cfg.platform_match);
    }

    #[test]
    fn test_score_keyword_bonus_per_match() {
        let cfg = config();
        let one = score_link(
            "https://example.org/listing/console",
            "Sony PlayStation Console",
            "Amazon",
            &cfg,
        );
        let two = score_link(
            "https://example.org/sony/console",
            "Sony PlayStation Console",
            "Amazon",
            &cfg,
        );
        assert_eq!(two - one, cfg.keyword_match);
    }

    #[test]
    fn test_score_search_page_negative() {
        // Platform bonus cannot rescue a search results page.
        let score = score_link(
            "https://www.amazon.in/s?k=ps5",
            "Sony PlayStation 5 Console",
            "Amazon",
            &config(),
        );
        assert!(score < 0, "search page scored {}", score);
    }

    #[test]
    fn test_score_model_number_hyphenated() {
        let cfg = config();
        let with = score_link(
            "https://www.amazon.in/sony-wh-1000xm5-wireless/dp/B09XS7JWHH",
            "Sony WH-1000XM5 Headphones",
            "Amazon",
            &cfg,
        );
        let without = score_link(
            "https://www.amazon.in/sony-wireless-headphones/dp/B09XS7JWHH",
            "Sony WH-1000XM5 Headphones",
            "Amazon",
            &cfg,
        );
        // Keyword overlap is equal on both sides (two matches each); the
        // difference is the model-number hit alone.
        assert_eq!(with - without, cfg.model_number);
    }

    #[test]
    fn test_score_model_number_letters_digits() {
        let cfg = config();
        let with = score_link(
            "https://www.flipkart.com/samsung-galaxy-s24/p/itm6ac9f5f19f42bdef",
            "Samsung Galaxy S24",
            "Flipkart",
            &cfg,
        );
        let without = score_link(
            "https://www.flipkart.com/samsung-galaxy-phone/p/itm6ac9f5f19f42bdef",
            "Samsung Galaxy S24",
            "Flipkart",
            &cfg,
        );
        // "s24" counts both as the model token and as a title keyword.
        assert_eq!(with - without, cfg.model_number + cfg.keyword_match);
    }

    #[test]
    fn test_brand_mismatch_dominates_positive_signals() {
        // Deep-link shape, keyword overlap, and a model-number hit all
        // together must not rescue a wrong-brand URL.
        let score = score_link(
            "https://www.apple.com/shop/buy-iphone/galaxy-rival-s24-ultra-trade-in",
            "Samsung Galaxy S24 Ultra",
            "Amazon",
            &config(),
        );
        assert!(score < 0, "wrong-brand URL scored {}", score);
    }

    #[test]
    fn test_no_mismatch_when_brand_shared_by_title() {
        let t = "apple iphone 14 midnight";
        assert!(!brand_mismatch(
            "https://www.flipkart.com/apple-iphone-14-midnight-128-gb/p/itm9e6293c322a84",
            t,
            &config().brands,
        ));
    }

    #[test]
    fn test_no_mismatch_without_title_brand() {
        assert!(!brand_mismatch(
            "https://www.apple.com/shop/buy-iphone",
            "wireless charging pad",
            &config().brands,
        ));
    }

    // ─── Resolution ─────────────────────────────────────────────────

    #[test]
    fn test_resolve_prefers_grounded_deep_link_over_claimed_search_page() {
        let final_url = resolve(
            "https://www.amazon.in/s?k=ps5",
            &[
                candidate("https://www.flipkart.com/search?q=playstation"),
                candidate("https://www.amazon.in/Sony-PlayStation-5-Console/dp/B0BRCP72X8"),
            ],
            "Sony PlayStation 5 Console",
            "Amazon",
            &config(),
        );
        assert_eq!(final_url, "https://www.amazon.in/dp/B0BRCP72X8");
    }

    #[test]
    fn test_resolve_without_candidates_returns_canonicalized_claim() {
        let final_url = resolve(
            "https://www.amazon.in/Apple-iPhone-15/dp/B0CHX1W1XY?tag=aff",
            &[],
            "Apple iPhone 15",
            "Amazon",
            &config(),
        );
        assert_eq!(final_url, "https://www.amazon.in/dp/B0CHX1W1XY");
    }

    #[test]
    fn test_resolve_tie_keeps_claimed_url() {
        // The candidate scores exactly as high as the claimed URL; the
        // earlier-seen claim must win the tie.
        let claimed = "https://www.amazon.in/Apple-iPhone-15/dp/B0CHX1W1XY";
        let final_url = resolve(
            claimed,
            &[candidate("https://www.amazon.in/Apple-iPhone-15/dp/B0AAAAAAAA")],
            "Apple iPhone 15",
            "Amazon",
            &config(),
        );
        assert_eq!(final_url, "https://www.amazon.in/dp/B0CHX1W1XY");
    }

    #[test]
    fn test_resolve_skips_wrong_brand_candidate() {
        let final_url = resolve(
            "https://www.amazon.in/Samsung-Galaxy-S24-Ultra/dp/B0CQYKNYW5",
            &[candidate(
                "https://www.amazon.in/Apple-iPhone-15-Pro/dp/B0CHXFCYCR",
            )],
            "Samsung Galaxy S24 Ultra",
            "Amazon",
            &config(),
        );
        assert_eq!(final_url, "https://www.amazon.in/dp/B0CQYKNYW5");
    }

    #[test]
    fn test_safety_net_recall_below_confidence_floor() {
        // Weights zeroed so the deep-link candidate cannot win on score:
        // only the safety-net rescan can surface it.
        let cfg = ResolverConfig {
            deep_link: 0,
            keyword_match: 0,
            model_number: 0,
            ..ResolverConfig::default()
        };

        let claimed = "https://www.amazon.in/gift-guide/electronics-corner";
        let grounded = "https://www.flipkart.com/sony-playstation-5-console/p/itm6ac9f5f19f42bdef";

        assert!(score_link(claimed, "Sony PlayStation Console", "Amazon", &cfg) < cfg.confidence_floor);
        assert!(
            score_link(grounded, "Sony PlayStation Console", "Amazon", &cfg)
                <= score_link(claimed, "Sony PlayStation Console", "Amazon", &cfg)
        );

        let final_url = resolve(
            claimed,
            &[candidate("https://www.flipkart.com"), candidate(grounded)],
            "Sony PlayStation Console",
            "Amazon",
            &cfg,
        );
        assert_eq!(
            final_url,
            "https://www.flipkart.com/p/itm6ac9f5f19f42bdef"
        );
    }

    #[test]
    fn test_safety_net_still_rejects_brand_mismatch() {
        let cfg = ResolverConfig {
            deep_link: 0,
            keyword_match: 0,
            model_number: 0,
            ..ResolverConfig::default()
        };

        let claimed = "https://www.amazon.in/gift-guide/electronics-corner";
        // Deep link, two keyword matches, but names a different brand.
        let wrong_brand =
            "https://www.flipkart.com/samsung-playstation-console-dock/p/itm6ac9f5f19f42bdef";

        let final_url = resolve(
            claimed,
            &[candidate(wrong_brand)],
            "Sony PlayStation Console",
            "Amazon",
            &cfg,
        );
        assert_eq!(final_url, claimed);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let candidates = [
            candidate("https://www.amazon.in/s?k=galaxy"),
            candidate("https://www.amazon.in/Samsung-Galaxy-S24/dp/B0CQYKNYW5"),
        ];
        let first = resolve(
            "https://www.amazon.in",
            &candidates,
            "Samsung Galaxy S24",
            "Amazon",
            &config(),
        );
        let second = resolve(
            "https://www.amazon.in",
            &candidates,
            "Samsung Galaxy S24",
            "Amazon",
            &config(),
        );
        assert_eq!(first, second);
    }

    // ─── Token helpers ──────────────────────────────────────────────

    #[test]
    fn test_model_number_patterns() {
        assert_eq!(
            model_number_token("sony wh-1000xm5 headphones"),
            Some("wh-1000xm5".to_string())
        );
        assert_eq!(
            model_number_token("samsung galaxy s24 ultra"),
            Some("s24".to_string())
        );
        assert_eq!(
            model_number_token("iphone 15 (128gb) deal"),
            Some("128gb".to_string())
        );
        assert_eq!(model_number_token("sony playstation console"), None);
    }

    #[test]
    fn test_title_keywords_drop_short_words() {
        let t = "sony playstation 5 console".to_string();
        let words: Vec<&str> = title_keywords(&t).collect();
        assert_eq!(words, vec!["sony", "playstation", "console"]);
    }
}
