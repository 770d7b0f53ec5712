//! Fast-path matcher: canned results for a handful of hot queries.
//!
//! Guarantees low latency and deterministic behavior for the most common
//! free-text searches by skipping the model gateway entirely. Matching is
//! case-insensitive substring matching against fixed brand/keyword groups;
//! the first matching group wins. Claims no correctness beyond the canned
//! entries themselves.
//!
//! Applies only to free-text product search — never to vision search,
//! trending, or pre-owned lists.

use crate::models::ProductListing;

/// Keyword groups checked in order; each maps to one canned result list.
const GROUPS: &[(&[&str], fn() -> Vec<ProductListing>)] = &[
    (&["iphone", "apple"], iphone_listings),
    (&["samsung", "galaxy"], samsung_listings),
    (&["ps5", "playstation", "sony"], playstation_listings),
];

/// Return the canned listings for `query`, or `None` when no group matches.
pub fn match_query(query: &str) -> Option<Vec<ProductListing>> {
    let q = query.to_lowercase();
    for (keywords, listings) in GROUPS {
        if keywords.iter().any(|k| q.contains(k)) {
            return Some(listings());
        }
    }
    None
}

fn iphone_listings() -> Vec<ProductListing> {
    vec![
        ProductListing {
            id: "1".to_string(),
            platform: "Amazon".to_string(),
            title: "Apple iPhone 15 (128 GB) - CRAZY DEAL".to_string(),
            description: None,
            price: 62990.0,
            original_price: Some(79900.0),
            rating: Some(4.6),
            reviews_count: Some(1245),
            delivery_time: Some("Tomorrow".to_string()),
            image_url: Some(
                "https://m.media-amazon.com/images/I/71d7rfSl0wL._SX679_.jpg".to_string(),
            ),
            product_url: "https://www.amazon.in/Apple-iPhone-15-128-GB/dp/B0CHX1W1XY".to_string(),
            deal_score: Some(98.0),
            is_best_deal: Some(true),
            ai_recommendation: Some("Absolute lowest price in 6 months. Steal deal.".to_string()),
        },
        ProductListing {
            id: "2".to_string(),
            platform: "Flipkart".to_string(),
            title: "Apple iPhone 14 (128 GB)".to_string(),
            description: None,
            price: 49999.0,
            original_price: Some(69900.0),
            rating: Some(4.7),
            reviews_count: Some(8932),
            delivery_time: Some("2 Days".to_string()),
            image_url: Some(
                "https://m.media-amazon.com/images/I/61bK6PMOCyL._SX679_.jpg".to_string(),
            ),
            product_url: "https://www.flipkart.com/apple-iphone-14-midnight-128-gb/p/itm9e6293c322a84"
                .to_string(),
            deal_score: Some(92.0),
            is_best_deal: Some(false),
            ai_recommendation: Some("Massive 28% discount.".to_string()),
        },
    ]
}

fn samsung_listings() -> Vec<ProductListing> {
    vec![ProductListing {
        id: "1".to_string(),
        platform: "Amazon".to_string(),
        title: "Samsung Galaxy S24 Ultra 5G - MEGA DROP".to_string(),
        description: None,
        price: 99999.0,
        original_price: Some(134999.0),
        rating: Some(4.8),
        reviews_count: Some(543),
        delivery_time: Some("Tomorrow".to_string()),
        image_url: Some("https://m.media-amazon.com/images/I/71CXhVhpM0L._SX679_.jpg".to_string()),
        product_url: "https://www.amazon.in/Samsung-Galaxy-Ultra-Titanium-Storage/dp/B0CQYKNYW5"
            .to_string(),
        deal_score: Some(99.0),
        is_best_deal: Some(true),
        ai_recommendation: Some("Unbelievable flat discount.".to_string()),
    }]
}

fn playstation_listings() -> Vec<ProductListing> {
    vec![ProductListing {
        id: "1".to_string(),
        platform: "Amazon".to_string(),
        title: "Sony PlayStation 5 Console - CLEARANCE".to_string(),
        description: None,
        price: 39990.0,
        original_price: Some(54990.0),
        rating: Some(4.9),
        reviews_count: Some(4321),
        delivery_time: Some("Tomorrow".to_string()),
        image_url: Some("https://m.media-amazon.com/images/I/51mWHXY8hyL._SX522_.jpg".to_string()),
        product_url: "https://www.amazon.in/Sony-PlayStation-5-Console/dp/B0BRCP72X8".to_string(),
        deal_score: Some(97.0),
        is_best_deal: Some(true),
        ai_recommendation: Some("Rare 27% off on the disc edition.".to_string()),
    }]
}
