//! Query builder: instruction text plus structured-output contract per
//! discovery mode.
//!
//! Each plan carries the natural-language instruction, the JSON schema the
//! model's response must satisfy, and the tool capabilities the gateway
//! should enable. Every instruction constrains the result count and repeats
//! the hard deep-link rule: `productUrl` must point at a product detail
//! page (`/dp/B0...`, `/p/itm...`), never a search or category URL. The
//! model routinely violates this anyway, which is why the resolver exists.

use serde_json::{json, Value};

/// Tool capabilities the model gateway can enable for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCapability {
    /// General web search with grounding metadata.
    WebSearch,
    /// Fetch and read the page at a URL contained in the prompt.
    UrlContext,
}

/// Inline image payload for vision search.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A fully assembled model request: what to ask, what shape to demand,
/// which tools to allow.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub prompt: String,
    pub response_schema: Value,
    pub tools: Vec<ToolCapability>,
    pub image: Option<InlineImage>,
}

/// True when the free-text query is itself a URL, which flips the text
/// search into identify-and-compare mode.
pub fn is_url_query(query: &str) -> bool {
    query.starts_with("http://") || query.starts_with("https://")
}

/// Plan for a free-text (or pasted-URL) product search.
pub fn text_search_plan(query: &str, currency: &str) -> QueryPlan {
    let mut tools = vec![ToolCapability::WebSearch];

    let prompt = if is_url_query(query) {
        tools.push(ToolCapability::UrlContext);
        format!(
            "Product URL: {query}.\n\
             1. Identify exact product/brand.\n\
             2. Find lowest prices on Amazon, Flipkart, etc.\n\
             RULES:\n\
             - ONLY return EXACT brand/model.\n\
             - productUrl MUST be a deep link from search.\n\
             - Return prices in {currency}."
        )
    } else {
        format!(
            "Search \"{query}\" on Amazon.in, Flipkart.com, etc.\n\
             Compare prices and provide direct links.\n\
             RULES:\n\
             - ONLY return EXACT brand/model.\n\
             - productUrl MUST be a deep link (e.g., /dp/B0... or /p/itm...).\n\
             - NEVER return search pages (/s?k= or /search).\n\
             - Return prices in {currency}."
        )
    };

    QueryPlan {
        prompt,
        response_schema: product_listing_schema(),
        tools,
        image: None,
    }
}

/// Plan for an image-based search. The model first identifies the product
/// in the image, then lists offers for that exact product only.
pub fn vision_search_plan(image: &[u8], mime_type: &str, currency: &str) -> QueryPlan {
    let prompt = format!(
        "Identify the EXACT brand and model in this image.\n\
         Generate 3 product listings for THIS SPECIFIC PRODUCT ONLY.\n\
         \n\
         RULES:\n\
         - ONLY return results for the EXACT brand. No alternatives.\n\
         - productUrl MUST be a deep link (e.g., /dp/B0... or /p/itm...).\n\
         - NEVER return search pages (/s?k= or /search).\n\
         - Return prices in {currency} as numbers."
    );

    QueryPlan {
        prompt,
        response_schema: vision_result_schema(),
        tools: vec![ToolCapability::WebSearch],
        image: Some(InlineImage {
            mime_type: mime_type.to_string(),
            data: image.to_vec(),
        }),
    }
}

/// Plan for the trending-deals list (exactly 3 items).
pub fn trending_plan(currency: &str) -> QueryPlan {
    let prompt = format!(
        "Search for 3 trending electronic products with 40%+ price drops on Amazon.in, Flipkart.com.\n\
         RULES:\n\
         - productUrl MUST be a deep link (e.g., /dp/B0... or /p/itm...).\n\
         - NEVER return search pages (/s?k= or /search).\n\
         - imageUrl MUST be a direct image link.\n\
         Return prices in {currency} as numbers."
    );

    QueryPlan {
        prompt,
        response_schema: trending_listing_schema(),
        tools: vec![ToolCapability::WebSearch],
        image: None,
    }
}

/// Plan for the pre-owned list (exactly 6 items).
pub fn pre_owned_plan(currency: &str) -> QueryPlan {
    let prompt = format!(
        "Search for 6 pre-owned electronic deals with MASSIVE price drops from OLX, Cashify, Amazon Renewed. \
         Return prices in {currency} as numbers.\n\
         RULES:\n\
         - productUrl MUST be a deep link (e.g., /dp/B0... or /p/itm...).\n\
         - NEVER return search pages (/s?k= or /search).\n\
         - imageUrl MUST be a direct image link."
    );

    QueryPlan {
        prompt,
        response_schema: pre_owned_listing_schema(),
        tools: vec![ToolCapability::WebSearch],
        image: None,
    }
}

// ============ Output schemas ============
//
// Structural contracts enforced on the model response, in the provider's
// uppercase type vocabulary. Field names must match the serde wire names
// in `models`.

fn product_listing_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "platform": { "type": "STRING", "description": "e.g., Amazon, Flipkart" },
                "title": { "type": "STRING" },
                "description": { "type": "STRING" },
                "price": { "type": "NUMBER" },
                "originalPrice": { "type": "NUMBER" },
                "rating": { "type": "NUMBER" },
                "reviewsCount": { "type": "NUMBER" },
                "deliveryTime": { "type": "STRING", "description": "e.g., Tomorrow, 2 Days" },
                "imageUrl": { "type": "STRING", "description": "Real image URL of the product if available, otherwise empty string" },
                "productUrl": { "type": "STRING", "description": "The EXACT, FULL deep link to the product page found in search results. DO NOT return a homepage URL." },
                "dealScore": { "type": "NUMBER", "description": "AI calculated deal score 0-100" },
                "isBestDeal": { "type": "BOOLEAN" },
                "aiRecommendation": { "type": "STRING", "description": "Short reason why this is recommended" }
            },
            "required": ["id", "platform", "title", "price", "productUrl", "dealScore", "isBestDeal"]
        }
    })
}

fn vision_result_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "detectedProduct": { "type": "STRING" },
            "products": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "platform": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "price": { "type": "NUMBER" },
                        "matchType": { "type": "STRING", "description": "Exact Match, Cheaper Alternative, Trending" },
                        "imageUrl": { "type": "STRING" },
                        "productUrl": { "type": "STRING", "description": "The EXACT, FULL deep link to the product page found in search results." },
                        "rating": { "type": "NUMBER" }
                    },
                    "required": ["id", "platform", "title", "price", "matchType", "rating", "productUrl"]
                }
            }
        }
    })
}

fn trending_listing_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "platform": { "type": "STRING" },
                "title": { "type": "STRING" },
                "price": { "type": "NUMBER" },
                "originalPrice": { "type": "NUMBER" },
                "discount": { "type": "NUMBER", "description": "Percentage discount" },
                "rating": { "type": "NUMBER" },
                "imageUrl": { "type": "STRING" },
                "productUrl": { "type": "STRING", "description": "The EXACT, FULL deep link to the product page found in search results." }
            },
            "required": ["id", "platform", "title", "price", "originalPrice", "discount", "rating", "productUrl"]
        }
    })
}

fn pre_owned_listing_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "platform": { "type": "STRING" },
                "platformRating": { "type": "NUMBER", "description": "Rating of the seller/platform out of 5" },
                "title": { "type": "STRING" },
                "price": { "type": "NUMBER" },
                "newPrice": { "type": "NUMBER" },
                "conditionScore": { "type": "NUMBER", "description": "0-100" },
                "riskLevel": { "type": "STRING", "description": "Low, Medium, High" },
                "worthBuying": { "type": "BOOLEAN" },
                "imageUrl": { "type": "STRING" },
                "productUrl": { "type": "STRING", "description": "The EXACT, FULL deep link to the product page found in search results." }
            },
            "required": ["id", "platform", "platformRating", "title", "price", "newPrice", "conditionScore", "riskLevel", "worthBuying", "productUrl"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_search() {
        let plan = text_search_plan("mechanical keyboard", "INR");
        assert!(plan.prompt.contains("mechanical keyboard"));
        assert!(plan.prompt.contains("INR"));
        assert!(plan.prompt.contains("NEVER return search pages"));
        assert_eq!(plan.tools, vec![ToolCapability::WebSearch]);
        assert!(plan.image.is_none());
    }

    #[test]
    fn test_url_query_switches_mode() {
        let plan = text_search_plan("https://www.amazon.in/dp/B0CHX1W1XY", "USD");
        assert!(plan.prompt.starts_with("Product URL:"));
        assert!(plan.prompt.contains("Identify exact product/brand"));
        assert_eq!(
            plan.tools,
            vec![ToolCapability::WebSearch, ToolCapability::UrlContext]
        );
    }

    #[test]
    fn test_is_url_query() {
        assert!(is_url_query("https://www.flipkart.com/p/itm123"));
        assert!(is_url_query("http://example.com"));
        assert!(!is_url_query("iphone 15"));
        assert!(!is_url_query("www.amazon.in"));
    }

    #[test]
    fn test_trending_plan_constraints() {
        let plan = trending_plan("INR");
        assert!(plan.prompt.contains("3 trending"));
        let required = &plan.response_schema["items"]["required"];
        assert!(required
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("discount")));
    }

    #[test]
    fn test_pre_owned_plan_constraints() {
        let plan = pre_owned_plan("EUR");
        assert!(plan.prompt.contains("6 pre-owned"));
        assert!(plan.prompt.contains("EUR"));
        let required = &plan.response_schema["items"]["required"];
        assert!(required
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("riskLevel")));
    }

    #[test]
    fn test_vision_plan_carries_image() {
        let plan = vision_search_plan(&[0xFF, 0xD8], "image/jpeg", "INR");
        let image = plan.image.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, vec![0xFF, 0xD8]);
        assert!(plan.prompt.contains("3 product listings"));
        assert_eq!(plan.response_schema["type"], "OBJECT");
    }
}
