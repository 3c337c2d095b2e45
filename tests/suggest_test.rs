//! Integration tests covering the scenarios and properties in `spec.md` §8.
//!
//! Requires Docker to run the ephemeral Redis container `TestFixture` spins
//! up; marked `#[serial]` because every test shares the `djac.test` root.

mod common;

use std::sync::{Arc, OnceLock};

use autocompleter::error::Result;
use autocompleter::{FacetDict, FacetExpression, FacetPair, FacetType, Provider, ProviderMeta, SuggestResult};
use common::TestFixture;
use serde_json::{json, Value};
use serial_test::serial;

struct Item {
    id: &'static str,
    terms: Vec<&'static str>,
    score: f64,
    sector: Option<&'static str>,
}

fn item(id: &'static str, terms: &[&'static str], score: f64) -> Item {
    Item { id, terms: terms.to_vec(), score, sector: None }
}

struct BasicProvider;

impl ProviderMeta for BasicProvider {
    fn provider_name(&self) -> &str {
        "basic"
    }

    fn declared_facets(&self) -> &[String] {
        static FACETS: OnceLock<Vec<String>> = OnceLock::new();
        FACETS.get_or_init(|| vec!["sector".to_string()])
    }
}

impl Provider<Item> for BasicProvider {
    fn get_item_id(&self, item: &Item) -> String {
        item.id.to_string()
    }

    fn get_terms(&self, item: &Item) -> Vec<String> {
        item.terms.iter().map(|t| t.to_string()).collect()
    }

    fn get_score(&self, item: &Item) -> f64 {
        item.score
    }

    fn get_data(&self, item: &Item) -> Value {
        json!({ "id": item.id, "search_name": item.terms.last().unwrap_or(&item.id) })
    }

    fn get_facets(&self, item: &Item) -> Vec<(String, String)> {
        item.sector.map(|s| vec![("sector".to_string(), s.to_string())]).unwrap_or_default()
    }
}

struct AliasedProvider {
    two_way: std::collections::HashMap<String, Vec<String>>,
    one_way: std::collections::HashMap<String, Vec<String>>,
}

impl ProviderMeta for AliasedProvider {
    fn provider_name(&self) -> &str {
        "aliased"
    }

    fn phrase_aliases(&self) -> std::collections::HashMap<String, Vec<String>> {
        self.two_way.clone()
    }

    fn one_way_phrase_aliases(&self) -> std::collections::HashMap<String, Vec<String>> {
        self.one_way.clone()
    }
}

impl Provider<Item> for AliasedProvider {
    fn get_item_id(&self, item: &Item) -> String {
        item.id.to_string()
    }

    fn get_terms(&self, item: &Item) -> Vec<String> {
        item.terms.iter().map(|t| t.to_string()).collect()
    }

    fn get_score(&self, item: &Item) -> f64 {
        item.score
    }

    fn get_data(&self, item: &Item) -> Value {
        json!({ "id": item.id })
    }
}

fn ids_in(result: &SuggestResult, provider: &str) -> Vec<String> {
    match result {
        SuggestResult::Grouped(map) => map
            .get(provider)
            .map(|payloads| payloads.iter().filter_map(|p| p["id"].as_str().map(String::from)).collect())
            .unwrap_or_default(),
        SuggestResult::Flat(payloads) => {
            payloads.iter().filter_map(|p| p["id"].as_str().map(String::from)).collect()
        }
    }
}

#[tokio::test]
#[serial]
async fn s1_accent_fold() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let provider = BasicProvider;
    let handle: Arc<dyn ProviderMeta> = Arc::new(BasicProvider);
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    fixture.engine.store(&provider, &item("1", &["Estée Lauder", "EL"], 10.0), true).await?;

    for query in ["estee lauder", "estée lauder"] {
        let result = fixture.engine.suggest("ac", query, &FacetExpression::new()).await?;
        assert!(ids_in(&result, "basic").contains(&"1".to_string()), "query {query:?} missed item 1");
    }
    Ok(())
}

#[tokio::test]
#[serial]
async fn s2_two_way_alias() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let mut two_way = std::collections::HashMap::new();
    two_way.insert(
        "United States".to_string(),
        vec!["US".to_string(), "USA".to_string(), "America".to_string()],
    );
    let provider = AliasedProvider { two_way, one_way: Default::default() };
    let handle: Arc<dyn ProviderMeta> = Arc::new(AliasedProvider {
        two_way: provider.two_way.clone(),
        one_way: Default::default(),
    });
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    fixture
        .engine
        .store(&provider, &item("cpi", &["US Consumer Price Index"], 1.0), true)
        .await?;

    for query in [
        "us consumer price index",
        "united states consumer price index",
        "usa consumer price index",
        "america consumer price index",
    ] {
        let result = fixture.engine.suggest("ac", query, &FacetExpression::new()).await?;
        assert!(!ids_in(&result, "aliased").is_empty(), "query {query:?} returned nothing");
    }
    Ok(())
}

#[tokio::test]
#[serial]
async fn s3_no_double_alias() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let mut two_way = std::collections::HashMap::new();
    two_way.insert("California".to_string(), vec!["CA".to_string()]);
    two_way.insert("Canada".to_string(), vec!["CA".to_string()]);
    let provider = AliasedProvider { two_way: two_way.clone(), one_way: Default::default() };
    let handle: Arc<dyn ProviderMeta> = Arc::new(AliasedProvider { two_way, one_way: Default::default() });
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    fixture.engine.store(&provider, &item("ca-unemployment", &["California Unemployment"], 1.0), true).await?;
    fixture.engine.store(&provider, &item("can-unemployment", &["Canada Unemployment"], 1.0), true).await?;

    let result = fixture.engine.suggest("ac", "california unemployment", &FacetExpression::new()).await?;
    let ids = ids_in(&result, "aliased");
    assert!(ids.contains(&"ca-unemployment".to_string()));
    assert!(!ids.contains(&"can-unemployment".to_string()));
    Ok(())
}

#[tokio::test]
#[serial]
async fn s6_facet_and() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let provider = BasicProvider;
    let handle: Arc<dyn ProviderMeta> = Arc::new(BasicProvider);
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    let mut telecom = item("CHTR", &["Charter Communications"], 5.0);
    telecom.sector = Some("Communication Services");
    let mut tech = item("AAPL", &["Apple"], 5.0);
    tech.sector = Some("Technology");

    fixture.engine.store(&provider, &telecom, true).await?;
    fixture.engine.store(&provider, &tech, true).await?;

    let facets: FacetExpression = vec![FacetDict {
        kind: FacetType::And,
        facets: vec![FacetPair { key: "sector".to_string(), value: "Communication Services".to_string() }],
    }];

    let result = fixture.engine.suggest("ac", "ch", &facets).await?;
    let ids = ids_in(&result, "basic");
    assert!(ids.contains(&"CHTR".to_string()));
    assert!(!ids.contains(&"AAPL".to_string()));
    Ok(())
}

#[tokio::test]
#[serial]
async fn p2_remove_hides_item() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let provider = BasicProvider;
    let handle: Arc<dyn ProviderMeta> = Arc::new(BasicProvider);
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    let i = item("x", &["Xylophone"], 1.0);
    fixture.engine.store(&provider, &i, true).await?;
    assert!(!ids_in(
        &fixture.engine.suggest("ac", "xyl", &FacetExpression::new()).await?,
        "basic"
    )
    .is_empty());

    fixture.engine.remove(&provider, &i).await?;
    assert!(ids_in(&fixture.engine.suggest("ac", "xyl", &FacetExpression::new()).await?, "basic").is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn p3_identical_restore_is_fast_path() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let provider = BasicProvider;
    let handle: Arc<dyn ProviderMeta> = Arc::new(BasicProvider);
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    let i = item("dup", &["Duplicate Term"], 1.0);
    fixture.engine.store(&provider, &i, true).await?;
    fixture.engine.store(&provider, &i, true).await?;

    let result = fixture.engine.suggest("ac", "duplicate", &FacetExpression::new()).await?;
    assert_eq!(ids_in(&result, "basic"), vec!["dup".to_string()]);
    Ok(())
}

#[tokio::test]
#[serial]
async fn get_provider_result_from_id_returns_payload_or_null() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let provider = BasicProvider;
    let handle: Arc<dyn ProviderMeta> = Arc::new(BasicProvider);
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    fixture.engine.store(&provider, &item("z", &["Zebra"], 1.0), true).await?;

    let found = fixture.engine.get_provider_result_from_id("ac", "basic", "z").await?;
    assert_eq!(found["id"], "z");

    let missing = fixture.engine.get_provider_result_from_id("ac", "basic", "nope").await?;
    assert!(missing.is_null());

    let unknown_provider = fixture.engine.get_provider_result_from_id("ac", "ghost", "z").await?;
    assert!(unknown_provider.is_null());
    Ok(())
}

#[tokio::test]
#[serial]
async fn p9_remove_all_clears_the_namespace() -> Result<()> {
    let fixture = TestFixture::new().await?;
    let provider = BasicProvider;
    let handle: Arc<dyn ProviderMeta> = Arc::new(BasicProvider);
    fixture.engine.register_autocompleter("ac", vec![handle]).await;

    fixture.engine.store_all(&provider, vec![item("a", &["Alpha"], 1.0), item("b", &["Beta"], 1.0)], true).await?;
    fixture.engine.remove_all(&provider).await?;

    let result = fixture.engine.suggest("ac", "alpha", &FacetExpression::new()).await?;
    assert!(ids_in(&result, "basic").is_empty());
    Ok(())
}
