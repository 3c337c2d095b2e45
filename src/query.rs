//! Query engine: `suggest`/`exact_suggest` (see `spec.md` §4.5).

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::Result;
use crate::facet::{self, FacetExpression, FacetType};
use crate::keys::KeySchema;
use crate::normalize::Normalizer;
use crate::registry::Registry;
use crate::store::RedisStore;

/// Output shape of `suggest`/`exact_suggest`: grouped by provider name, or a
/// single flattened list when the autocompleter has exactly one provider and
/// `FLATTEN_SINGLE_TYPE_RESULTS` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuggestResult {
    Grouped(BTreeMap<String, Vec<Value>>),
    Flat(Vec<Value>),
}

impl SuggestResult {
    fn empty() -> Self {
        SuggestResult::Grouped(BTreeMap::new())
    }
}

#[derive(Clone)]
pub struct QueryEngine {
    store: RedisStore,
    keys: KeySchema,
    cache: Cache,
}

/// A provider's final id list going into budget allocation and hydration.
struct ProviderCandidates {
    name: String,
    ids: Vec<String>,
}

impl QueryEngine {
    pub fn new(store: RedisStore, keys: KeySchema, cache: Cache) -> Self {
        Self { store, keys, cache }
    }

    pub async fn suggest(
        &self,
        registry: &Registry,
        autocompleter: &str,
        query: &str,
        facets: &FacetExpression,
    ) -> Result<SuggestResult> {
        facet::validate(facets)?;
        let providers = registry.providers(autocompleter);
        if providers.is_empty() {
            return Ok(SuggestResult::empty());
        }

        let global = registry.global_settings();
        let cache_normalizer = Normalizer::new(global.join_chars.clone(), &global.character_filter)?;
        if cache_normalizer.normalize(query).is_empty() {
            return Ok(SuggestResult::empty());
        }

        let facet_hash = facet::hash(facets);
        let canonical_query = cache_normalizer.canonical_query_key(query);
        let cache_key = self.keys.cache_entry(autocompleter, &canonical_query, &facet_hash);
        if global.cache_timeout > 0 {
            if let Some(cached) = self.cache.get::<SuggestResult>(&cache_key).await? {
                return Ok(cached);
            }
        }

        let query_uuid = Uuid::new_v4().to_string();
        let mut ephemeral: Vec<String> = Vec::new();
        let flatten = global.flatten_single_type_results && providers.len() == 1;

        // Collected in a block so an early error can still best-effort clean
        // up whatever ephemeral keys were created before the failure
        // (spec.md §5 cancellation guidance), instead of leaking them until a
        // future bulk operation happens to reap them.
        let build_result: Result<Vec<ProviderCandidates>> = async {
            let mut candidates = Vec::with_capacity(providers.len());
            for provider in &providers {
                let provider_name = provider.provider_name().to_string();
                let settings = registry.resolve_settings(autocompleter, &provider_name);
                let normalizer = Normalizer::new(settings.join_chars.clone(), &settings.character_filter)?;
                let variants = normalizer.normalize(query);

                if query.chars().count() < settings.min_letters || variants.is_empty() {
                    candidates.push(ProviderCandidates { name: provider_name, ids: Vec::new() });
                    continue;
                }

                let mut per_variant_keys: Vec<String> = Vec::new();
                for (vi, variant) in variants.iter().enumerate() {
                    let words: Vec<&str> = variant.split(' ').filter(|w| !w.is_empty()).collect();
                    if words.is_empty() {
                        continue;
                    }
                    if words.len() == 1 {
                        per_variant_keys.push(self.keys.prefix_set(&provider_name, words[0]));
                    } else {
                        let dest = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-v{vi}")));
                        let sources: Vec<String> =
                            words.iter().map(|w| self.keys.prefix_set(&provider_name, w)).collect();
                        self.store.zinterstore_min(&dest, &sources).await?;
                        ephemeral.push(dest.clone());
                        per_variant_keys.push(dest);
                    }
                }

                let result_key = if per_variant_keys.len() == 1 {
                    per_variant_keys.into_iter().next().unwrap()
                } else if per_variant_keys.is_empty() {
                    candidates.push(ProviderCandidates { name: provider_name, ids: Vec::new() });
                    continue;
                } else {
                    let dest = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-union")));
                    self.store.zunionstore_min(&dest, &per_variant_keys).await?;
                    ephemeral.push(dest.clone());
                    dest
                };

                let declared: HashSet<&str> = provider.declared_facets().iter().map(String::as_str).collect();
                let referenced = facet::referenced_keys(facets);
                let facets_apply = !facets.is_empty() && referenced.iter().all(|k| declared.contains(k.as_str()));

                let mut facet_dict_keys: Vec<String> = Vec::new();
                let final_key = if facets_apply {
                    for (fi, dict) in facets.iter().enumerate() {
                        let pair_keys: Vec<String> = dict
                            .facets
                            .iter()
                            .map(|p| self.keys.facet_set(&provider_name, &p.key, &p.value))
                            .collect();
                        let dest = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-f{fi}")));
                        match dict.kind {
                            FacetType::And => self.store.zinterstore_min(&dest, &pair_keys).await?,
                            FacetType::Or => self.store.zunionstore_min(&dest, &pair_keys).await?,
                        }
                        ephemeral.push(dest.clone());
                        facet_dict_keys.push(dest);
                    }
                    let mut all_keys = vec![result_key.clone()];
                    all_keys.extend(facet_dict_keys.iter().cloned());
                    let dest = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-faceted")));
                    self.store.zinterstore_min(&dest, &all_keys).await?;
                    ephemeral.push(dest.clone());
                    dest
                } else {
                    result_key
                };

                let mut ids = self
                    .store
                    .zrange(&final_key, 0, (global.max_results as isize).saturating_sub(1))
                    .await?;

                if settings.move_exact_matches_to_top && settings.max_exact_match_words > 0 {
                    let exact_keys: Vec<String> = variants
                        .iter()
                        .filter(|v| {
                            v.split(' ').filter(|w| !w.is_empty()).count() <= settings.max_exact_match_words
                        })
                        .map(|v| self.keys.exact_set(&provider_name, v))
                        .collect();

                    if !exact_keys.is_empty() {
                        let exact_union = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-exact")));
                        self.store.zunionstore_min(&exact_union, &exact_keys).await?;
                        ephemeral.push(exact_union.clone());

                        let exact_final = if facet_dict_keys.is_empty() {
                            exact_union
                        } else {
                            let mut all_keys = vec![exact_union.clone()];
                            all_keys.extend(facet_dict_keys.iter().cloned());
                            let dest = self
                                .keys
                                .ephemeral(&query_uuid, Some(&format!("{provider_name}-exact-faceted")));
                            self.store.zinterstore_min(&dest, &all_keys).await?;
                            ephemeral.push(dest.clone());
                            dest
                        };

                        let mut exacts = self
                            .store
                            .zrange(&exact_final, 0, (global.max_results as isize).saturating_sub(1))
                            .await?;
                        // Reversed before head-insertion so higher-logical-score exacts
                        // (lower stored score, earlier in ascending order) stay earliest.
                        exacts.reverse();
                        for id in exacts {
                            ids.retain(|existing| existing != &id);
                            ids.insert(0, id);
                        }
                    }
                }

                candidates.push(ProviderCandidates { name: provider_name, ids });
            }
            Ok(candidates)
        }
        .await;

        let mut candidates = match build_result {
            Ok(candidates) => candidates,
            Err(e) => {
                if !ephemeral.is_empty() {
                    let _ = self.store.del(&ephemeral).await;
                }
                return Err(e);
            }
        };

        if !ephemeral.is_empty() {
            self.store.del(&ephemeral).await?;
        }

        let k = global.max_results;
        apply_budget(&mut candidates, k);

        let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        let mut flat: Vec<Value> = Vec::new();
        for candidate in &candidates {
            let payloads = self.hydrate(&candidate.name, &candidate.ids).await?;
            if flatten {
                flat = payloads;
            } else {
                grouped.insert(candidate.name.clone(), payloads);
            }
        }

        let result = if flatten { SuggestResult::Flat(flat) } else { SuggestResult::Grouped(grouped) };

        if global.cache_timeout > 0 {
            self.cache.set(&cache_key, global.cache_timeout, &result).await?;
        }

        Ok(result)
    }

    pub async fn exact_suggest(
        &self,
        registry: &Registry,
        autocompleter: &str,
        query: &str,
        facets: &FacetExpression,
    ) -> Result<SuggestResult> {
        facet::validate(facets)?;
        let providers = registry.providers(autocompleter);
        if providers.is_empty() {
            return Ok(SuggestResult::empty());
        }

        let global = registry.global_settings();
        let flatten = global.flatten_single_type_results && providers.len() == 1;
        let facet_hash = facet::hash(facets);
        let cache_key = self.keys.exact_cache_entry(autocompleter, &format!("{query}.{facet_hash}"));
        if global.cache_timeout > 0 {
            if let Some(cached) = self.cache.get::<SuggestResult>(&cache_key).await? {
                return Ok(cached);
            }
        }

        let query_uuid = Uuid::new_v4().to_string();
        let mut ephemeral: Vec<String> = Vec::new();

        let build_result: Result<(BTreeMap<String, Vec<Value>>, Vec<Value>)> = async {
            let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
            let mut flat: Vec<Value> = Vec::new();

            for provider in &providers {
                let provider_name = provider.provider_name().to_string();
                let settings = registry.resolve_settings(autocompleter, &provider_name);
                let normalizer = Normalizer::new(settings.join_chars.clone(), &settings.character_filter)?;
                let variants = normalizer.normalize(query);

                if query.chars().count() < settings.min_letters
                    || variants.is_empty()
                    || settings.max_exact_match_words == 0
                {
                    if flatten {
                        flat = Vec::new();
                    } else {
                        grouped.insert(provider_name, Vec::new());
                    }
                    continue;
                }

                let exact_keys: Vec<String> = variants
                    .iter()
                    .filter(|v| v.split(' ').filter(|w| !w.is_empty()).count() <= settings.max_exact_match_words)
                    .map(|v| self.keys.exact_set(&provider_name, v))
                    .collect();

                let ids = if exact_keys.is_empty() {
                    Vec::new()
                } else {
                    let declared: HashSet<&str> = provider.declared_facets().iter().map(String::as_str).collect();
                    let referenced = facet::referenced_keys(facets);
                    let facets_apply =
                        !facets.is_empty() && referenced.iter().all(|k| declared.contains(k.as_str()));

                    let union_key = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-exact")));
                    self.store.zunionstore_min(&union_key, &exact_keys).await?;
                    ephemeral.push(union_key.clone());

                    let final_key = if facets_apply {
                        let mut facet_dict_keys: Vec<String> = Vec::new();
                        for (fi, dict) in facets.iter().enumerate() {
                            let pair_keys: Vec<String> = dict
                                .facets
                                .iter()
                                .map(|p| self.keys.facet_set(&provider_name, &p.key, &p.value))
                                .collect();
                            let dest = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-ef{fi}")));
                            match dict.kind {
                                FacetType::And => self.store.zinterstore_min(&dest, &pair_keys).await?,
                                FacetType::Or => self.store.zunionstore_min(&dest, &pair_keys).await?,
                            }
                            ephemeral.push(dest.clone());
                            facet_dict_keys.push(dest);
                        }
                        let mut all_keys = vec![union_key.clone()];
                        all_keys.extend(facet_dict_keys);
                        let dest = self.keys.ephemeral(&query_uuid, Some(&format!("{provider_name}-efaceted")));
                        self.store.zinterstore_min(&dest, &all_keys).await?;
                        ephemeral.push(dest.clone());
                        dest
                    } else {
                        union_key
                    };

                    self.store.zrange(&final_key, 0, (settings.max_results as isize).saturating_sub(1)).await?
                };

                let payloads = self.hydrate(&provider_name, &ids).await?;
                if flatten {
                    flat = payloads;
                } else {
                    grouped.insert(provider_name, payloads);
                }
            }
            Ok((grouped, flat))
        }
        .await;

        let (grouped, flat) = match build_result {
            Ok(pair) => pair,
            Err(e) => {
                if !ephemeral.is_empty() {
                    let _ = self.store.del(&ephemeral).await;
                }
                return Err(e);
            }
        };

        if !ephemeral.is_empty() {
            self.store.del(&ephemeral).await?;
        }

        let result = if flatten { SuggestResult::Flat(flat) } else { SuggestResult::Grouped(grouped) };
        if global.cache_timeout > 0 {
            self.cache.set(&cache_key, global.cache_timeout, &result).await?;
        }
        Ok(result)
    }

    /// Single-id payload lookup against a provider's id->payload map, bypassing
    /// prefix/exact matching entirely (`spec.md` §6 "Suggest surface").
    /// Returns `null` (an empty mapping) rather than an error when the
    /// autocompleter/provider pair or id is unknown or stale.
    pub async fn get_provider_result_from_id(
        &self,
        registry: &Registry,
        autocompleter: &str,
        provider_name: &str,
        id: &str,
    ) -> Result<Value> {
        if registry.provider_by_name(autocompleter, provider_name).is_none() {
            return Ok(Value::Null);
        }
        let payload_key = self.keys.payload_map(provider_name);
        match self.store.hget(&payload_key, id).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Value::Null),
        }
    }

    async fn hydrate(&self, provider_name: &str, ids: &[String]) -> Result<Vec<Value>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let payload_key = self.keys.payload_map(provider_name);
        let raw = self.store.hmget(&payload_key, ids).await?;
        let mut out = Vec::with_capacity(ids.len());
        for entry in raw {
            // Stale posting: id present in a set but missing from id->payload.
            // Silently dropped per spec.md §7.
            if let Some(raw) = entry {
                out.push(serde_json::from_str(&raw)?);
            }
        }
        Ok(out)
    }
}

/// Elastic per-provider budget allocation (spec.md §4.5 step 6). `k` is the
/// overall MAX_RESULTS for the autocompleter; each candidate's `ids` is
/// truncated in place to its final allowance.
fn apply_budget(candidates: &mut [ProviderCandidates], k: usize) {
    let n = candidates.len();
    if n == 0 {
        return;
    }
    let base = k / n;
    let mut remainder = k % n;
    let mut allowance = vec![0usize; n];
    for slot in allowance.iter_mut() {
        *slot = base + if remainder > 0 { remainder -= 1; 1 } else { 0 };
    }

    let mut final_cap = vec![0usize; n];
    let mut surplus = 0usize;
    let mut room = vec![0usize; n];
    let mut deficits: VecDeque<usize> = VecDeque::new();

    for i in 0..n {
        let actual = candidates[i].ids.len();
        if actual <= allowance[i] {
            final_cap[i] = actual;
            surplus += allowance[i] - actual;
        } else {
            final_cap[i] = allowance[i];
            room[i] = actual - allowance[i];
            deficits.push_back(i);
        }
    }

    while surplus > 0 {
        let Some(i) = deficits.pop_front() else { break };
        final_cap[i] += 1;
        room[i] -= 1;
        surplus -= 1;
        if room[i] > 0 {
            deficits.push_back(i);
        }
    }

    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.ids.truncate(final_cap[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, count: usize) -> ProviderCandidates {
        ProviderCandidates {
            name: name.to_string(),
            ids: (0..count).map(|i| format!("{name}-{i}")).collect(),
        }
    }

    #[test]
    fn surplus_flows_to_the_deficit_provider() {
        let mut candidates = vec![candidate("a", 5), candidate("b", 9), candidate("c", 1)];
        apply_budget(&mut candidates, 16);
        let total: usize = candidates.iter().map(|c| c.ids.len()).sum();
        assert!(total <= 16);
        assert_eq!(candidates[0].ids.len(), 5);
        assert_eq!(candidates[2].ids.len(), 1);
        assert!(candidates[1].ids.len() >= 6);
    }

    #[test]
    fn never_exceeds_overall_budget() {
        let mut candidates = vec![candidate("a", 100), candidate("b", 100)];
        apply_budget(&mut candidates, 10);
        let total: usize = candidates.iter().map(|c| c.ids.len()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn skipped_provider_contributes_full_allowance_as_surplus() {
        let mut candidates = vec![candidate("a", 0), candidate("b", 20)];
        apply_budget(&mut candidates, 10);
        assert_eq!(candidates[0].ids.len(), 0);
        assert_eq!(candidates[1].ids.len(), 10);
    }
}
