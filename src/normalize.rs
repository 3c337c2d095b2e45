//! Text normalization: raw input → canonical form → join-character variant set
//!
//! Pipeline order settled per the historical ambiguity this crate resolves:
//! strip (lowercase, decompose, de-accent, `&` → `and`) → trim → join-character
//! mapping → character filter → whitespace collapse.

use std::collections::HashSet;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Default characters allowed to survive the character filter.
const DEFAULT_FILTER_PATTERN: &str = r"[^a-z0-9_ ]";

/// Default join characters: interpreted either as a space or as nothing.
const DEFAULT_JOIN_CHARS: &[char] = &['-', '/'];

/// Produces normalized term variations from raw input text.
#[derive(Clone)]
pub struct Normalizer {
    join_chars: Vec<char>,
    filter: Regex,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("join_chars", &self.join_chars)
            .field("filter", &self.filter.as_str())
            .finish()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            join_chars: DEFAULT_JOIN_CHARS.to_vec(),
            filter: Regex::new(DEFAULT_FILTER_PATTERN).expect("default filter regex is valid"),
        }
    }
}

impl Normalizer {
    /// Build a normalizer with explicit join characters and character-filter regex.
    pub fn new(join_chars: Vec<char>, filter_pattern: &str) -> crate::error::Result<Self> {
        let filter = Regex::new(filter_pattern)
            .map_err(|e| crate::error::Error::Configuration(format!("invalid character filter regex: {e}")))?;
        Ok(Self { join_chars, filter })
    }

    pub fn join_chars(&self) -> &[char] {
        &self.join_chars
    }

    /// Strip accents/case/symbols down to the pre-join-mapping canonical form.
    fn strip(&self, input: &str) -> String {
        let lowered = input.to_lowercase();
        // NFKD decomposition, then drop combining marks and any remaining non-ASCII.
        let decomposed: String = lowered.nfkd().filter(|c| c.is_ascii()).collect();
        let replaced = decomposed.replace('&', "and");
        replaced.trim().to_string()
    }

    /// Apply the character filter and collapse whitespace runs.
    fn finish(&self, input: &str) -> String {
        let filtered = self.filter.replace_all(input, "");
        let collapsed = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    }

    /// Canonicalize a single string through the full deterministic pipeline,
    /// with a fixed interpretation of every join character (already substituted
    /// by the caller before calling this).
    fn canonicalize(&self, input: &str) -> String {
        let stripped = self.strip(input);
        self.finish(&stripped)
    }

    /// Produce every normalized variant of `input`: one per combination of
    /// join-character interpretations (space vs. empty) present in the input,
    /// fully canonicalized, blanks dropped, duplicates removed preserving
    /// first occurrence.
    pub fn normalize(&self, input: &str) -> Vec<String> {
        let stripped = self.strip(input);

        let present: Vec<char> = self
            .join_chars
            .iter()
            .copied()
            .filter(|c| stripped.contains(*c))
            .collect();

        let mut seen = HashSet::new();
        let mut out = Vec::new();

        // 2^n combinations; n is bounded in practice by how many distinct join
        // characters a single term uses (at most a handful).
        let combos = 1usize << present.len();
        for mask in 0..combos {
            let mut variant = stripped.clone();
            for (i, ch) in present.iter().enumerate() {
                let as_space = (mask >> i) & 1 == 0;
                let replacement = if as_space { " " } else { "" };
                variant = variant.replace(*ch, replacement);
            }
            let canonical = self.finish(&variant);
            if canonical.is_empty() {
                continue;
            }
            if seen.insert(canonical.clone()) {
                out.push(canonical);
            }
        }

        out
    }

    /// Canonicalize a query string the same way a single configured variant
    /// would be, without expanding join-character combinations. Used for cache
    /// key composition where exactly one canonical form of the raw query is
    /// needed (see `keys::cache_key`).
    pub fn canonical_query_key(&self, input: &str) -> String {
        self.canonicalize(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accent_fold() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Estée Lauder"), vec!["estee lauder"]);
    }

    #[test]
    fn ampersand_becomes_and() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("AT&T"), vec!["atandt"]);
    }

    #[test]
    fn join_char_variants() {
        let n = Normalizer::default();
        let variants = n.normalize("U/S-A");
        for expected in ["usa", "u sa", "us a", "u s a"] {
            assert!(
                variants.contains(&expected.to_string()),
                "missing variant {expected:?} in {variants:?}"
            );
        }
    }

    #[test]
    fn blank_variants_dropped() {
        let n = Normalizer::default();
        let variants = n.normalize("-");
        assert!(variants.is_empty());
    }

    #[test]
    fn whitespace_collapsed() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("  hello    world  "), vec!["hello world"]);
    }

    #[test]
    fn default_filter_drops_punctuation() {
        let n = Normalizer::default();
        assert_eq!(
            n.normalize("Mortgage-Backed Securities!"),
            n.normalize("Mortgage-Backed Securities")
        );
    }

    #[test]
    fn duplicates_deduplicated_preserving_order() {
        let n = Normalizer::default();
        // No join chars present: exactly one variant.
        let variants = n.normalize("hello world");
        assert_eq!(variants, vec!["hello world"]);
    }
}
