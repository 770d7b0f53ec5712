//! # Deal Scout
//!
//! A generative-AI backed deal discovery and product-link resolution
//! service.
//!
//! Deal Scout delegates product discovery, pricing, and ranking to a
//! generative model with web-search grounding, then repairs the product
//! URLs the model returns — which are frequently hallucinated, stale, or
//! point at search pages — with a deterministic scoring heuristic over the
//! grounding candidate URLs.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌─────────┐   ┌──────────┐
//! │ DealService │──▶│ CacheStore │   │ QueryPlan │──▶│ DealModel │
//! │ (4 ops)     │   │ SQLite/Mem │   │ (4 modes) │   │ (Gemini)  │
//! └─────┬──────┘   └───────────┘   └─────────┘   └────┬─────┘
//!       │                                              │
//!       │            ┌──────────────┐    text + grounding URLs
//!       └───────────▶│ URL Resolver │◀───────────────┘
//!                    │ score + pick │
//!                    └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! deals trending                     # 3 trending deals, cached 120s
//! deals search "iphone 15"           # free-text search (fast path)
//! deals search https://www.amazon.in/dp/B0CHX1W1XY
//! deals preowned --refresh           # bypass the cache slot
//! deals vision ./photo.jpg           # identify product in an image
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Listing data types |
//! | [`cache`] | Time-boxed response cache (SQLite and in-memory) |
//! | [`fastpath`] | Canned results for hot queries |
//! | [`query`] | Instruction + output-schema builder per mode |
//! | [`gateway`] | Model gateway (Gemini REST) |
//! | [`resolver`] | URL scoring and resolution heuristic |
//! | [`service`] | Orchestrators for the four public operations |
//! | [`db`] | Cache database connection |

pub mod cache;
pub mod config;
pub mod db;
pub mod fastpath;
pub mod gateway;
pub mod models;
pub mod query;
pub mod resolver;
pub mod service;
