//! Three-tier settings override: global → provider → autocompleter+provider
//! (see `spec.md` §4.6).

use crate::error::{Error, Result};

/// Fully-resolved settings for one (autocompleter, provider) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub max_results: usize,
    pub min_letters: usize,
    pub max_exact_match_words: usize,
    pub move_exact_matches_to_top: bool,
    /// Cache TTL in seconds; 0 disables caching.
    pub cache_timeout: u64,
    pub join_chars: Vec<char>,
    pub character_filter: String,
    pub flatten_single_type_results: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_letters: 1,
            max_exact_match_words: 10,
            move_exact_matches_to_top: true,
            cache_timeout: 0,
            join_chars: vec!['-', '/'],
            character_filter: r"[^a-z0-9_ ]".to_string(),
            flatten_single_type_results: false,
        }
    }
}

impl Settings {
    /// A missing/invalid required setting is a fatal configuration error at
    /// startup (`spec.md` §7).
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(Error::Configuration("MAX_RESULTS must be > 0".to_string()));
        }
        Ok(())
    }
}

/// A partial override of `Settings`; any `None` field falls through to the
/// next layer down.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverride {
    pub max_results: Option<usize>,
    pub min_letters: Option<usize>,
    pub max_exact_match_words: Option<usize>,
    pub move_exact_matches_to_top: Option<bool>,
    pub cache_timeout: Option<u64>,
    pub join_chars: Option<Vec<char>>,
    pub character_filter: Option<String>,
    pub flatten_single_type_results: Option<bool>,
}

impl SettingsOverride {
    fn apply(&self, base: &Settings) -> Settings {
        Settings {
            max_results: self.max_results.unwrap_or(base.max_results),
            min_letters: self.min_letters.unwrap_or(base.min_letters),
            max_exact_match_words: self
                .max_exact_match_words
                .unwrap_or(base.max_exact_match_words),
            move_exact_matches_to_top: self
                .move_exact_matches_to_top
                .unwrap_or(base.move_exact_matches_to_top),
            cache_timeout: self.cache_timeout.unwrap_or(base.cache_timeout),
            join_chars: self.join_chars.clone().unwrap_or_else(|| base.join_chars.clone()),
            character_filter: self
                .character_filter
                .clone()
                .unwrap_or_else(|| base.character_filter.clone()),
            flatten_single_type_results: self
                .flatten_single_type_results
                .unwrap_or(base.flatten_single_type_results),
        }
    }
}

/// Resolves the three settings layers in lookup order:
/// autocompleter+provider → provider → global.
#[derive(Debug, Clone)]
pub struct SettingsResolver {
    global: Settings,
    provider_overrides: std::collections::HashMap<String, SettingsOverride>,
    /// Keyed by `"{autocompleter}\u{0}{provider}"`.
    pair_overrides: std::collections::HashMap<String, SettingsOverride>,
}

fn pair_key(autocompleter: &str, provider: &str) -> String {
    format!("{autocompleter}\u{0}{provider}")
}

impl SettingsResolver {
    pub fn new(global: Settings) -> Self {
        Self {
            global,
            provider_overrides: Default::default(),
            pair_overrides: Default::default(),
        }
    }

    pub fn set_provider_override(&mut self, provider: &str, over: SettingsOverride) {
        self.provider_overrides.insert(provider.to_string(), over);
    }

    pub fn set_pair_override(&mut self, autocompleter: &str, provider: &str, over: SettingsOverride) {
        self.pair_overrides
            .insert(pair_key(autocompleter, provider), over);
    }

    pub fn resolve(&self, autocompleter: &str, provider: &str) -> Settings {
        let mut resolved = self.global.clone();
        if let Some(over) = self.provider_overrides.get(provider) {
            resolved = over.apply(&resolved);
        }
        if let Some(over) = self.pair_overrides.get(&pair_key(autocompleter, provider)) {
            resolved = over.apply(&resolved);
        }
        resolved
    }

    pub fn global(&self) -> &Settings {
        &self.global
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_global_with_no_overrides() {
        let resolver = SettingsResolver::new(Settings { max_results: 7, ..Settings::default() });
        let resolved = resolver.resolve("stocks_ac", "stock");
        assert_eq!(resolved.max_results, 7);
    }

    #[test]
    fn provider_override_beats_global() {
        let mut resolver = SettingsResolver::new(Settings::default());
        resolver.set_provider_override(
            "stock",
            SettingsOverride { max_results: Some(20), ..Default::default() },
        );
        assert_eq!(resolver.resolve("any_ac", "stock").max_results, 20);
    }

    #[test]
    fn pair_override_beats_provider_override() {
        let mut resolver = SettingsResolver::new(Settings::default());
        resolver.set_provider_override(
            "stock",
            SettingsOverride { max_results: Some(20), ..Default::default() },
        );
        resolver.set_pair_override(
            "watchlist_ac",
            "stock",
            SettingsOverride { max_results: Some(5), ..Default::default() },
        );
        assert_eq!(resolver.resolve("watchlist_ac", "stock").max_results, 5);
        assert_eq!(resolver.resolve("other_ac", "stock").max_results, 20);
    }

    #[test]
    fn unset_fields_fall_through() {
        let mut resolver = SettingsResolver::new(Settings { min_letters: 3, ..Settings::default() });
        resolver.set_provider_override(
            "stock",
            SettingsOverride { max_results: Some(20), ..Default::default() },
        );
        let resolved = resolver.resolve("any_ac", "stock");
        assert_eq!(resolved.max_results, 20);
        assert_eq!(resolved.min_letters, 3);
    }
}
