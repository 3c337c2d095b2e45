//! Deterministic Redis key names for every posting kind (see `spec.md` §4.3).

/// Builds every Redis key shape under a single root namespace.
///
/// A distinct root (e.g. `"djac.test"`) should be used for test-mode
/// indexing so bulk teardown can scan that root safely without touching
/// production postings.
#[derive(Debug, Clone)]
pub struct KeySchema {
    root: String,
}

impl KeySchema {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// `<root>.<provider>` — id → payload map
    pub fn payload_map(&self, provider: &str) -> String {
        format!("{}.{}", self.root, provider)
    }

    /// `<root>.<provider>.tm` — id → normalized-terms map
    pub fn terms_map(&self, provider: &str) -> String {
        format!("{}.{}.tm", self.root, provider)
    }

    /// `<root>.<provider>.fm` — id → facet-list map
    pub fn facets_map(&self, provider: &str) -> String {
        format!("{}.{}.fm", self.root, provider)
    }

    /// `<root>.<provider>.p.<prefix>` — (provider, prefix) ordered set
    pub fn prefix_set(&self, provider: &str, prefix: &str) -> String {
        format!("{}.{}.p.{}", self.root, provider, prefix)
    }

    /// `<root>.<provider>.ps` — provider prefix bookkeeping set
    pub fn prefix_bookkeeping(&self, provider: &str) -> String {
        format!("{}.{}.ps", self.root, provider)
    }

    /// `<root>.<provider>.e.<term>` — (provider, exact-term) ordered set
    pub fn exact_set(&self, provider: &str, term: &str) -> String {
        format!("{}.{}.e.{}", self.root, provider, term)
    }

    /// `<root>.<provider>.es` — provider exact bookkeeping set
    pub fn exact_bookkeeping(&self, provider: &str) -> String {
        format!("{}.{}.es", self.root, provider)
    }

    /// `<root>.<provider>.f.<key>.<value>` — (provider, facet-key, facet-value) ordered set
    pub fn facet_set(&self, provider: &str, facet_key: &str, facet_value: &str) -> String {
        format!("{}.{}.f.{}.{}", self.root, provider, facet_key, facet_value)
    }

    /// `<root>.<provider>.fs` — provider facet bookkeeping set, tracking every
    /// `<key>.<value>` token ever written so `remove_all` can discover and
    /// delete every facet ordered set without a separate facet catalog.
    pub fn facet_bookkeeping(&self, provider: &str) -> String {
        format!("{}.{}.fs", self.root, provider)
    }

    /// Encode a (key, value) pair as the token stored in the facet bookkeeping set.
    pub fn facet_token(facet_key: &str, facet_value: &str) -> String {
        format!("{facet_key}.{facet_value}")
    }

    /// `<root>.<autocompleter>.c.<normalized-query>.<facet-hash>` — query cache entry
    pub fn cache_entry(&self, autocompleter: &str, normalized_query: &str, facet_hash: &str) -> String {
        format!("{}.{}.c.{}.{}", self.root, autocompleter, normalized_query, facet_hash)
    }

    /// `<root>.<autocompleter>.ce.<query>` — exact-query cache entry
    pub fn exact_cache_entry(&self, autocompleter: &str, query: &str) -> String {
        format!("{}.{}.ce.{}", self.root, autocompleter, query)
    }

    /// `<root>.results.<uuid>[.<tag>]` — ephemeral intermediate set
    pub fn ephemeral(&self, uuid: &str, tag: Option<&str>) -> String {
        match tag {
            Some(tag) => format!("{}.results.{}.{}", self.root, uuid, tag),
            None => format!("{}.results.{}", self.root, uuid),
        }
    }

    /// Glob pattern matching every cache entry (normal + exact) for an
    /// autocompleter, used to purge its cache namespace on bulk writes.
    pub fn cache_glob(&self, autocompleter: &str) -> String {
        format!("{}.{}.c*", self.root, autocompleter)
    }

    pub fn exact_cache_glob(&self, autocompleter: &str) -> String {
        format!("{}.{}.ce.*", self.root, autocompleter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_match_spec() {
        let k = KeySchema::new("djac");
        assert_eq!(k.payload_map("stock"), "djac.stock");
        assert_eq!(k.terms_map("stock"), "djac.stock.tm");
        assert_eq!(k.facets_map("stock"), "djac.stock.fm");
        assert_eq!(k.prefix_set("stock", "ap"), "djac.stock.p.ap");
        assert_eq!(k.prefix_bookkeeping("stock"), "djac.stock.ps");
        assert_eq!(k.exact_set("stock", "apple"), "djac.stock.e.apple");
        assert_eq!(k.exact_bookkeeping("stock"), "djac.stock.es");
        assert_eq!(
            k.facet_set("stock", "sector", "tech"),
            "djac.stock.f.sector.tech"
        );
        assert_eq!(
            k.cache_entry("stocks", "ap", "abc123"),
            "djac.stocks.c.ap.abc123"
        );
        assert_eq!(k.exact_cache_entry("stocks", "apple"), "djac.stocks.ce.apple");
        assert_eq!(k.ephemeral("u1", None), "djac.results.u1");
        assert_eq!(k.ephemeral("u1", Some("exact")), "djac.results.u1.exact");
    }

    #[test]
    fn test_root_is_distinct() {
        let prod = KeySchema::new("djac");
        let test = KeySchema::new("djac.test");
        assert_ne!(prod.payload_map("stock"), test.payload_map("stock"));
    }
}
