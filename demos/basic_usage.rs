//! End-to-end usage: register a provider, index a few items, and query them
//! with and without facets.
//!
//! Requires a running Redis instance reachable at `AUTOCOMPLETER_REDIS_URL`
//! (defaults to `redis://127.0.0.1/` if unset).

use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};

use autocompleter::{Engine, FacetDict, FacetPair, FacetType, Provider, ProviderMeta};

struct Stock {
    symbol: String,
    name: String,
    sector: String,
    market_cap: f64,
}

struct StockProvider;

impl ProviderMeta for StockProvider {
    fn provider_name(&self) -> &str {
        "stock"
    }

    fn declared_facets(&self) -> &[String] {
        static FACETS: OnceLock<Vec<String>> = OnceLock::new();
        FACETS.get_or_init(|| vec!["sector".to_string()])
    }
}

impl Provider<Stock> for StockProvider {
    fn get_item_id(&self, item: &Stock) -> String {
        item.symbol.clone()
    }

    fn get_terms(&self, item: &Stock) -> Vec<String> {
        vec![item.name.clone(), item.symbol.clone()]
    }

    fn get_score(&self, item: &Stock) -> f64 {
        item.market_cap
    }

    fn get_data(&self, item: &Stock) -> Value {
        json!({
            "symbol": item.symbol,
            "name": item.name,
            "sector": item.sector,
        })
    }

    fn get_facets(&self, item: &Stock) -> Vec<(String, String)> {
        vec![("sector".to_string(), item.sector.clone())]
    }
}

#[tokio::main]
async fn main() -> autocompleter::error::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let redis_url = std::env::var("AUTOCOMPLETER_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1/".to_string());

    let engine = Engine::builder()
        .redis_url(redis_url)
        .root_namespace("djac-demo")
        .build()
        .await?;

    let provider = StockProvider;
    let provider_handle: Arc<dyn ProviderMeta> = Arc::new(StockProvider);
    engine.register_autocompleter("stocks_ac", vec![provider_handle]).await;

    let stocks = vec![
        Stock { symbol: "AAPL".into(), name: "Apple Inc".into(), sector: "Technology".into(), market_cap: 3_000.0 },
        Stock { symbol: "MSFT".into(), name: "Microsoft Corp".into(), sector: "Technology".into(), market_cap: 2_800.0 },
        Stock { symbol: "JPM".into(), name: "JPMorgan Chase".into(), sector: "Financials".into(), market_cap: 500.0 },
    ];

    engine.store_all(&provider, stocks, true).await?;

    let plain = engine.suggest("stocks_ac", "app", &vec![]).await?;
    println!("suggest(\"app\") => {plain:?}");

    let faceted = engine
        .suggest(
            "stocks_ac",
            "m",
            &vec![FacetDict {
                kind: FacetType::And,
                facets: vec![FacetPair { key: "sector".to_string(), value: "Technology".to_string() }],
            }],
        )
        .await?;
    println!("suggest(\"m\", sector=Technology) => {faceted:?}");

    Ok(())
}
