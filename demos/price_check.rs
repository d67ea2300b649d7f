//! Example: Price check an item across selected servers.
//!
//! Run with: cargo run --example price_check -- <item id> [Server=min:max ...]
//!
//! e.g. `cargo run --example price_check -- 5 Aether=100:5000 Primal=0:2000`

use std::time::Duration;

use universalis_price_cache::cache::MarketDataCache;
use universalis_price_cache::rest::UniversalisClient;
use universalis_price_cache::types::{ItemId, PriceFilters, PriceRange};
use universalis_price_cache::MarketError;

fn parse_filter(arg: &str) -> Option<(String, PriceRange)> {
    let (server, range) = arg.split_once('=')?;
    let (min, max) = range.split_once(':')?;
    Some((server.to_string(), PriceRange::new(min.parse().ok()?, max.parse().ok()?)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let item_id: u32 = args.next().unwrap_or_else(|| "5".to_string()).parse()?;

    let mut filters = PriceFilters::default();
    for arg in args {
        match parse_filter(&arg) {
            Some((server, range)) => filters.set_range(server, range),
            None => eprintln!("Ignoring malformed filter {arg:?}, expected Server=min:max"),
        }
    }
    if filters.selected_servers().is_empty() {
        filters.set_range("Aether", PriceRange::new(1, u64::MAX));
    }

    let client = UniversalisClient::builder()
        .timeout(Duration::from_secs(10))
        .build();
    let cache = MarketDataCache::new(client);

    match cache.check_prices(ItemId(item_id), &filters).await {
        Ok(report) => {
            for summary in report {
                println!("{summary}");
                if let (Some(min), Some(max)) = (summary.min_price, summary.max_price) {
                    println!("\t{} listings, {} - {}", summary.listings, min, max);
                }
            }
        }
        Err(MarketError::RateLimited { retry_after }) => {
            println!("Please wait {:.1} seconds before checking prices again.", retry_after.as_secs_f64());
        }
        Err(e) => return Err(e.into()),
    }

    // Immediately asking again is served from the cache.
    let cached = cache.check_prices(ItemId(item_id), &filters).await?;
    println!("Second check served {} servers from cache", cached.len());

    Ok(())
}
