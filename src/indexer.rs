//! Indexer: writes and retracts postings for a single item, with bulk
//! store/remove over an abstract item iterator (see `spec.md` §4.4).
//!
//! The choice of object-graph storage items are read from is an external
//! collaborator (`spec.md` §1); `store_all`/`remove_all` here consume
//! whatever `IntoIterator<Item = Item>` the caller hands them.

use std::collections::HashSet;

use serde_json::Value;

use crate::alias::AliasMap;
use crate::cache::Cache;
use crate::error::Result;
use crate::keys::KeySchema;
use crate::normalize::Normalizer;
use crate::provider::{Provider, ProviderMeta, ResolvedItem};
use crate::score::stored_score;
use crate::store::RedisStore;

/// Batch size for bulk key deletion, bounding command sizes per `spec.md` §4.4.
const DELETE_CHUNK_SIZE: usize = 100;

#[derive(Clone)]
pub struct Indexer {
    store: RedisStore,
    keys: KeySchema,
    normalizer: Normalizer,
    cache: Cache,
}

/// A provider's declared facets and its own (key, value) pairs serialized for
/// hashing/diffing, independent of any particular item type.
fn facet_set(facets: &[(String, String)]) -> HashSet<(String, String)> {
    facets.iter().cloned().collect()
}

impl Indexer {
    pub fn new(store: RedisStore, keys: KeySchema, normalizer: Normalizer, cache: Cache) -> Self {
        Self { store, keys, normalizer, cache }
    }

    fn alias_map(&self, meta: &impl ProviderMeta) -> AliasMap {
        AliasMap::build(&self.normalizer, &meta.phrase_aliases(), &meta.one_way_phrase_aliases())
    }

    /// Normalize and alias-expand every raw term, unioned across all terms.
    fn expand_terms(&self, alias_map: &AliasMap, terms: &[String]) -> HashSet<String> {
        let mut variants = HashSet::new();
        for term in terms {
            for normalized in self.normalizer.normalize(term) {
                for expanded in alias_map.expand(&normalized) {
                    variants.insert(expanded);
                }
            }
        }
        variants
    }

    async fn prior_terms(&self, provider_name: &str, id: &str) -> Result<Option<HashSet<String>>> {
        let raw = self.store.hget(&self.keys.terms_map(provider_name), id).await?;
        match raw {
            Some(raw) => {
                let terms: Vec<String> = serde_json::from_str(&raw)?;
                Ok(Some(terms.into_iter().collect()))
            }
            None => Ok(None),
        }
    }

    async fn prior_facets(&self, provider_name: &str, id: &str) -> Result<HashSet<(String, String)>> {
        let raw = self.store.hget(&self.keys.facets_map(provider_name), id).await?;
        match raw {
            Some(raw) => {
                let facets: Vec<(String, String)> = serde_json::from_str(&raw)?;
                Ok(facets.into_iter().collect())
            }
            None => Ok(HashSet::new()),
        }
    }

    /// Retract every prefix/exact posting associated with `variants` for `id`.
    fn retract_terms(&self, pipeline: &mut redis::Pipeline, provider_name: &str, id: &str, variants: &HashSet<String>, max_exact_match_words: usize) {
        for variant in variants {
            let words: Vec<&str> = variant.split(' ').filter(|w| !w.is_empty()).collect();
            for word in &words {
                let mut prefix = String::new();
                for ch in word.chars() {
                    prefix.push(ch);
                    pipeline.zrem(self.keys.prefix_set(provider_name, &prefix), id);
                }
            }
            if max_exact_match_words > 0 && words.len() <= max_exact_match_words {
                pipeline.zrem(self.keys.exact_set(provider_name, variant), id);
            }
        }
    }

    fn retract_facets(&self, pipeline: &mut redis::Pipeline, provider_name: &str, id: &str, facets: &HashSet<(String, String)>) {
        for (key, value) in facets {
            pipeline.zrem(self.keys.facet_set(provider_name, key, value), id);
        }
    }

    fn write_terms(&self, pipeline: &mut redis::Pipeline, provider_name: &str, id: &str, variants: &HashSet<String>, score: f64, max_exact_match_words: usize) {
        for variant in variants {
            if variant.is_empty() {
                continue;
            }
            let words: Vec<&str> = variant.split(' ').filter(|w| !w.is_empty()).collect();
            for word in &words {
                let mut prefix = String::new();
                for ch in word.chars() {
                    prefix.push(ch);
                    let key = self.keys.prefix_set(provider_name, &prefix);
                    pipeline.zadd(&key, id, score);
                    pipeline.sadd(self.keys.prefix_bookkeeping(provider_name), &prefix);
                }
            }
            if max_exact_match_words > 0 && words.len() <= max_exact_match_words {
                let key = self.keys.exact_set(provider_name, variant);
                pipeline.zadd(&key, id, score);
                pipeline.sadd(self.keys.exact_bookkeeping(provider_name), variant);
            }
        }
    }

    fn write_facets(&self, pipeline: &mut redis::Pipeline, provider_name: &str, id: &str, facets: &[(String, String)], score: f64) {
        for (key, value) in facets {
            let zkey = self.keys.facet_set(provider_name, key, value);
            pipeline.zadd(&zkey, id, score);
            let token = KeySchema::facet_token(key, value);
            pipeline.sadd(self.keys.facet_bookkeeping(provider_name), token);
        }
    }

    /// Store a single item: resolve it through `provider`, diff against the
    /// prior indexed state, and write/retract postings as needed.
    pub async fn store<Item>(&self, provider: &impl Provider<Item>, item: &Item, delete_old: bool) -> Result<()> {
        let Some(resolved) = provider.resolve(item) else {
            // include_item() returned false: skip silently, but retract any
            // prior posting for this id if it was previously included.
            let id = provider.get_item_id(item);
            return self.remove_by_id(provider, &id).await;
        };

        self.store_resolved(provider, &resolved, delete_old).await
    }

    async fn store_resolved<Item>(&self, provider: &impl Provider<Item>, resolved: &ResolvedItem, delete_old: bool) -> Result<()> {
        let provider_name = provider.provider_name();
        let max_exact = provider.max_exact_match_words();
        let alias_map = self.alias_map(provider);
        let variants = self.expand_terms(&alias_map, &resolved.terms);
        let new_facets = facet_set(&resolved.facets);

        let prior_variants = self.prior_terms(provider_name, &resolved.id).await?;
        let prior_facets = self.prior_facets(provider_name, &resolved.id).await?;

        let terms_unchanged = prior_variants.as_ref() == Some(&variants);
        let facets_unchanged = prior_facets == new_facets;

        if terms_unchanged && facets_unchanged {
            // Fast path (spec.md I5): only the payload changed.
            self.write_payload_only(provider_name, &resolved.id, &resolved.data).await?;
            return Ok(());
        }

        let score = stored_score(resolved.score);
        let mut pipeline = self.store.pipeline();

        if delete_old {
            if let Some(prior) = &prior_variants {
                if !terms_unchanged {
                    self.retract_terms(&mut pipeline, provider_name, &resolved.id, prior, max_exact);
                }
            }
            if !facets_unchanged {
                self.retract_facets(&mut pipeline, provider_name, &resolved.id, &prior_facets);
            }
        }

        self.write_terms(&mut pipeline, provider_name, &resolved.id, &variants, score, max_exact);
        self.write_facets(&mut pipeline, provider_name, &resolved.id, &resolved.facets, score);

        pipeline.hset(
            self.keys.payload_map(provider_name),
            &resolved.id,
            serde_json::to_string(&resolved.data)?,
        );
        pipeline.hset(
            self.keys.terms_map(provider_name),
            &resolved.id,
            serde_json::to_string(&variants.iter().cloned().collect::<Vec<_>>())?,
        );
        if !resolved.facets.is_empty() {
            pipeline.hset(
                self.keys.facets_map(provider_name),
                &resolved.id,
                serde_json::to_string(&resolved.facets)?,
            );
        } else {
            pipeline.hdel(self.keys.facets_map(provider_name), &resolved.id);
        }

        self.store.execute_pipeline(&pipeline).await
    }

    async fn write_payload_only(&self, provider_name: &str, id: &str, data: &Value) -> Result<()> {
        let mut pipeline = self.store.pipeline();
        pipeline.hset(self.keys.payload_map(provider_name), id, serde_json::to_string(data)?);
        self.store.execute_pipeline(&pipeline).await
    }

    /// Remove a single item, given its resolved form (the caller already has
    /// the item in hand and can resolve it through the same provider used to
    /// store it).
    pub async fn remove<Item>(&self, provider: &impl Provider<Item>, item: &Item) -> Result<()> {
        let id = provider.get_item_id(item);
        self.remove_by_id(provider, &id).await
    }

    async fn remove_by_id(&self, meta: &impl ProviderMeta, id: &str) -> Result<()> {
        let provider_name = meta.provider_name();
        let prior_variants = self.prior_terms(provider_name, id).await?;
        let Some(prior_variants) = prior_variants else {
            return Ok(()); // nothing indexed for this id; nothing to do
        };
        let prior_facets = self.prior_facets(provider_name, id).await?;

        let mut pipeline = self.store.pipeline();
        self.retract_terms(&mut pipeline, provider_name, id, &prior_variants, meta.max_exact_match_words());
        self.retract_facets(&mut pipeline, provider_name, id, &prior_facets);
        pipeline.hdel(self.keys.payload_map(provider_name), id);
        pipeline.hdel(self.keys.terms_map(provider_name), id);
        pipeline.hdel(self.keys.facets_map(provider_name), id);
        self.store.execute_pipeline(&pipeline).await
    }

    /// Store every item yielded by `items` through `provider`.
    pub async fn store_all<Item>(
        &self,
        provider: &impl Provider<Item>,
        items: impl IntoIterator<Item = Item>,
        delete_old: bool,
    ) -> Result<usize> {
        let mut count = 0usize;
        for item in items {
            self.store(provider, &item, delete_old).await?;
            count += 1;
        }
        tracing::info!(provider = provider.provider_name(), count, "store_all complete");
        Ok(count)
    }

    /// Remove every item yielded by `items` through `provider`.
    pub async fn remove_all_items<Item>(
        &self,
        provider: &impl Provider<Item>,
        items: impl IntoIterator<Item = Item>,
    ) -> Result<usize> {
        let mut count = 0usize;
        for item in items {
            self.remove(provider, &item).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Wipe every posting for a provider regardless of whether the
    /// underlying items still exist, by walking the bookkeeping sets.
    /// Clears the cache namespace of every autocompleter in `autocompleters`
    /// that references this provider.
    pub async fn remove_all(&self, meta: &impl ProviderMeta, autocompleters: &[String]) -> Result<()> {
        let provider_name = meta.provider_name();

        let prefixes = self.store.smembers(&self.keys.prefix_bookkeeping(provider_name)).await?;
        let exacts = self.store.smembers(&self.keys.exact_bookkeeping(provider_name)).await?;
        let facet_tokens = self.store.smembers(&self.keys.facet_bookkeeping(provider_name)).await?;

        let mut keys_to_delete: Vec<String> = Vec::new();
        keys_to_delete.extend(prefixes.iter().map(|p| self.keys.prefix_set(provider_name, p)));
        keys_to_delete.extend(exacts.iter().map(|t| self.keys.exact_set(provider_name, t)));
        keys_to_delete.extend(facet_tokens.iter().map(|token| {
            let (k, v) = token.split_once('.').unwrap_or((token.as_str(), ""));
            self.keys.facet_set(provider_name, k, v)
        }));
        keys_to_delete.push(self.keys.prefix_bookkeeping(provider_name));
        keys_to_delete.push(self.keys.exact_bookkeeping(provider_name));
        keys_to_delete.push(self.keys.facet_bookkeeping(provider_name));
        keys_to_delete.push(self.keys.payload_map(provider_name));
        keys_to_delete.push(self.keys.terms_map(provider_name));
        keys_to_delete.push(self.keys.facets_map(provider_name));

        for chunk in keys_to_delete.chunks(DELETE_CHUNK_SIZE) {
            self.store.del(chunk).await?;
        }

        for autocompleter in autocompleters {
            self.cache.invalidate_autocompleter(autocompleter).await?;
        }
        tracing::info!(provider = provider_name, "remove_all swept bookkeeping sets");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}
