//! Registry of autocompleter definitions, their provider lists, and layered
//! settings (see `spec.md` §2.3, §9).

use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::ProviderMeta;
use crate::settings::{Settings, SettingsOverride, SettingsResolver};

struct AutocompleterDef {
    providers: Vec<Arc<dyn ProviderMeta>>,
}

/// Maps autocompleter names to their ordered provider list, and resolves
/// layered settings per `spec.md` §4.6.
///
/// Re-registering an autocompleter under a name already in use replaces its
/// provider list, following the original system's idempotent-registration
/// behavior (`registry.py`'s `register`) rather than erroring — friendlier
/// for interactive setup and test fixtures than a hard failure.
pub struct Registry {
    autocompleters: HashMap<String, AutocompleterDef>,
    settings: SettingsResolver,
}

impl Registry {
    pub fn new(global_settings: Settings) -> Self {
        Self {
            autocompleters: HashMap::new(),
            settings: SettingsResolver::new(global_settings),
        }
    }

    pub fn register_autocompleter(&mut self, name: &str, providers: Vec<Arc<dyn ProviderMeta>>) {
        self.autocompleters
            .insert(name.to_string(), AutocompleterDef { providers });
    }

    pub fn set_provider_settings(&mut self, provider: &str, over: SettingsOverride) {
        self.settings.set_provider_override(provider, over);
    }

    pub fn set_pair_settings(&mut self, autocompleter: &str, provider: &str, over: SettingsOverride) {
        self.settings.set_pair_override(autocompleter, provider, over);
    }

    /// Ordered provider list for an autocompleter; empty if unregistered.
    pub fn providers(&self, autocompleter: &str) -> Vec<Arc<dyn ProviderMeta>> {
        self.autocompleters
            .get(autocompleter)
            .map(|def| def.providers.clone())
            .unwrap_or_default()
    }

    pub fn is_registered(&self, autocompleter: &str) -> bool {
        self.autocompleters.contains_key(autocompleter)
    }

    /// Every autocompleter name whose provider list currently includes
    /// `provider_name`, used to scope cache invalidation on `remove_all`.
    pub fn autocompleters_for_provider(&self, provider_name: &str) -> Vec<String> {
        self.autocompleters
            .iter()
            .filter(|(_, def)| def.providers.iter().any(|p| p.provider_name() == provider_name))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn provider_by_name(&self, autocompleter: &str, provider_name: &str) -> Option<Arc<dyn ProviderMeta>> {
        self.autocompleters
            .get(autocompleter)?
            .providers
            .iter()
            .find(|p| p.provider_name() == provider_name)
            .cloned()
    }

    pub fn resolve_settings(&self, autocompleter: &str, provider: &str) -> Settings {
        self.settings.resolve(autocompleter, provider)
    }

    pub fn global_settings(&self) -> &Settings {
        self.settings.global()
    }
}
