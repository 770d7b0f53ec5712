//! # Deal Scout CLI (`deals`)
//!
//! The `deals` binary exposes the four deal-discovery operations for demos
//! and manual testing.
//!
//! ## Usage
//!
//! ```bash
//! deals --config ./config/deals.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `deals search "<query>"` | Free-text or pasted-URL product search |
//! | `deals vision <image>` | Identify the product in an image and list offers |
//! | `deals trending` | 3 trending deals with steep discounts |
//! | `deals preowned` | 6 pre-owned deals with condition/risk signals |
//!
//! All commands read the model API key from the environment variable named
//! in `[gateway] api_key_env` (default `GEMINI_API_KEY`). Results are
//! cached for two minutes per currency; `--refresh` on the list commands
//! skips the cache read.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use deal_scout::cache::SqliteCache;
use deal_scout::config;
use deal_scout::gateway::GeminiGateway;
use deal_scout::models::{PreOwnedListing, ProductListing, TrendingListing, VisionSearchResult};
use deal_scout::service::{DealError, DealService};

/// Deal Scout — AI-backed deal discovery with trustworthy product links.
#[derive(Parser)]
#[command(
    name = "deals",
    about = "Deal Scout — AI-backed deal discovery with trustworthy product links",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Every setting has a default, so
    /// the file is optional.
    #[arg(long, global = true, default_value = "./config/deals.toml")]
    config: PathBuf,

    /// Currency for all returned prices.
    #[arg(long, global = true, default_value = "INR")]
    currency: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for product deals by free text, or paste a product URL to
    /// find cheaper listings of the same item elsewhere.
    Search {
        /// The search query, or an http(s) product URL.
        query: String,
    },

    /// Identify the exact product in an image and list offers for it.
    Vision {
        /// Path to the image file (jpeg/png/webp).
        image: PathBuf,
    },

    /// List trending deals with steep discounts.
    Trending {
        /// Skip the cache read and fetch fresh deals.
        #[arg(long)]
        refresh: bool,
    },

    /// List pre-owned deals with condition and risk signals.
    Preowned {
        /// Skip the cache read and fetch fresh deals.
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    let cache = Arc::new(SqliteCache::open(&cfg.cache).await?);
    let model = Arc::new(GeminiGateway::new(&cfg.gateway)?);
    let service = DealService::new(cfg, cache, model);

    let outcome = match cli.command {
        Commands::Search { query } => service
            .search_by_text(&query, &cli.currency)
            .await
            .map(|listings| print_products(&listings, &cli.currency)),
        Commands::Vision { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read image: {}", image.display()))?;
            let mime = mime_for(&image);
            service
                .search_by_image(&bytes, mime, &cli.currency)
                .await
                .map(|result| print_vision(&result, &cli.currency))
        }
        Commands::Trending { refresh } => service
            .trending_deals(&cli.currency, refresh)
            .await
            .map(|listings| print_trending(&listings, &cli.currency)),
        Commands::Preowned { refresh } => service
            .pre_owned_deals(&cli.currency, refresh)
            .await
            .map(|listings| print_preowned(&listings, &cli.currency)),
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(DealError::RateLimited) => {
            anyhow::bail!("Rate limited by the model provider. Wait a moment and retry.")
        }
    }
}

/// Guess a mime type from the file extension; the provider rejects
/// unlabeled image payloads.
fn mime_for(path: &PathBuf) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

fn print_products(listings: &[ProductListing], currency: &str) {
    if listings.is_empty() {
        println!("No deals found. Try again or refine the query.");
        return;
    }

    for (i, listing) in listings.iter().enumerate() {
        let best = if listing.is_best_deal == Some(true) {
            " ★ best deal"
        } else {
            ""
        };
        println!("{}. [{}] {}{}", i + 1, listing.platform, listing.title, best);
        match listing.original_price {
            Some(was) => println!("    price: {} {} (was {})", listing.price, currency, was),
            None => println!("    price: {} {}", listing.price, currency),
        }
        if let (Some(rating), Some(reviews)) = (listing.rating, listing.reviews_count) {
            println!("    rating: {} ({} reviews)", rating, reviews);
        }
        if let Some(delivery) = &listing.delivery_time {
            println!("    delivery: {}", delivery);
        }
        if let Some(reason) = &listing.ai_recommendation {
            println!("    note: {}", reason);
        }
        println!("    url: {}", listing.product_url);
        println!();
    }
}

fn print_vision(result: &VisionSearchResult, currency: &str) {
    if let Some(product) = &result.detected_product {
        println!("Detected: {}", product);
        println!();
    }
    if result.products.is_empty() {
        println!("No deals found for this image.");
        return;
    }

    for (i, item) in result.products.iter().enumerate() {
        println!(
            "{}. [{}] {} ({})",
            i + 1,
            item.platform,
            item.title,
            item.match_type
        );
        println!("    price: {} {}", item.price, currency);
        if let Some(rating) = item.rating {
            println!("    rating: {}", rating);
        }
        println!("    url: {}", item.product_url);
        println!();
    }
}

fn print_trending(listings: &[TrendingListing], currency: &str) {
    if listings.is_empty() {
        println!("No trending deals right now. Try --refresh.");
        return;
    }

    for (i, listing) in listings.iter().enumerate() {
        println!(
            "{}. [{}] {} (-{}%)",
            i + 1,
            listing.platform,
            listing.title,
            listing.discount
        );
        println!(
            "    price: {} {} (was {})",
            listing.price, currency, listing.original_price
        );
        println!("    url: {}", listing.product_url);
        println!();
    }
}

fn print_preowned(listings: &[PreOwnedListing], currency: &str) {
    if listings.is_empty() {
        println!("No pre-owned deals right now. Try --refresh.");
        return;
    }

    for (i, listing) in listings.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, listing.platform, listing.title);
        println!(
            "    price: {} {} ({} new)",
            listing.price, currency, listing.new_price
        );
        println!(
            "    condition: {}/100, risk: {:?}, worth buying: {}",
            listing.condition_score, listing.risk_level, listing.worth_buying
        );
        println!("    url: {}", listing.product_url);
        println!();
    }
}
