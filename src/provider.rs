//! Provider contract: the per-source adapter from items to indexable terms,
//! scores, payloads, and facets (see `spec.md` §6).
//!
//! `spec.md` §9 redesigns the original dynamic-dispatch-by-model-type scheme
//! into dispatch by provider identity: callers already know which provider
//! handles a given item (the item-change listener wiring lives outside this
//! crate, per §1's scope), so `store`/`remove` take the provider and item
//! together rather than the indexer looking the provider up from the item's
//! runtime type.

use std::collections::HashMap;

use serde_json::Value;

/// A single resolved (id, terms, score, payload, facets) tuple, as produced
/// by a `Provider` for one item. This is the shape the indexer actually
/// consumes; `Provider` methods below are how it's derived from a concrete
/// item type.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub id: String,
    pub terms: Vec<String>,
    pub score: f64,
    pub data: Value,
    pub facets: Vec<(String, String)>,
}

/// The subset of the provider contract that does not depend on a concrete
/// item type. Object-safe, so the `Registry` can hold `Arc<dyn ProviderMeta>`
/// for providers of heterogeneous item types under the same autocompleter.
pub trait ProviderMeta: Send + Sync {
    /// Short, unique name used as a Redis key prefix. Keep it short to
    /// preserve memory.
    fn provider_name(&self) -> &str;

    /// Facet keys this provider declares; every key here must also appear in
    /// `get_data()`'s map for items that have that facet.
    fn declared_facets(&self) -> &[String] {
        &[]
    }

    /// Two-way phrase aliases: every variant of the key maps to every variant
    /// of each value and vice versa.
    fn phrase_aliases(&self) -> HashMap<String, Vec<String>> {
        HashMap::new()
    }

    /// One-way phrase aliases: every variant of the key maps to every variant
    /// of each value; no reverse edges.
    fn one_way_phrase_aliases(&self) -> HashMap<String, Vec<String>> {
        HashMap::new()
    }

    /// Maximum word count for a normalized variant to be indexed as an exact
    /// match. `0` disables exact-match indexing entirely for this provider.
    fn max_exact_match_words(&self) -> usize {
        10
    }
}

/// The full provider contract for items of type `Item`.
pub trait Provider<Item>: ProviderMeta {
    /// Stable identifier for the item, unique within this provider.
    fn get_item_id(&self, item: &Item) -> String;

    /// Raw, human-readable terms attached to the item. Must be non-empty for
    /// an item that should be indexed.
    fn get_terms(&self, item: &Item) -> Vec<String>;

    /// Logical score; higher sorts earlier. `0.0` is the sentinel for "rank
    /// last".
    fn get_score(&self, item: &Item) -> f64;

    /// Opaque, JSON-serializable payload returned to callers on a match.
    fn get_data(&self, item: &Item) -> Value;

    /// Facet key/value pairs declared for this item. Keys must be a subset of
    /// `declared_facets()`.
    fn get_facets(&self, _item: &Item) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Gate: items for which this returns `false` are skipped on store (and
    /// treated as a remove if they were previously indexed).
    fn include_item(&self, _item: &Item) -> bool {
        true
    }

    /// Resolve an item into the indexer's (id, terms, score, payload, facets)
    /// tuple, or `None` if `include_item` rejects it.
    fn resolve(&self, item: &Item) -> Option<ResolvedItem> {
        if !self.include_item(item) {
            return None;
        }
        Some(ResolvedItem {
            id: self.get_item_id(item),
            terms: self.get_terms(item),
            score: self.get_score(item),
            data: self.get_data(item),
            facets: self.get_facets(item),
        })
    }
}
