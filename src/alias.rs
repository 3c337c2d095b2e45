//! Phrase alias expansion (see `spec.md` §4.2)
//!
//! Builds a normalized alias map from two-way and one-way raw phrase
//! dictionaries, then expands a single normalized term into every
//! semantically equivalent variant reachable by substituting aliased
//! sub-phrases, without ever re-aliasing a fragment that aliasing itself
//! produced.

use std::collections::{HashMap, HashSet};

use crate::normalize::Normalizer;

/// A word range `[start, end)` within a term, in word-index units.
type Range = (usize, usize);

/// Normalized phrase → replacement phrases, built from two-way and one-way
/// raw dictionaries via `AliasMap::build`.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    edges: HashMap<String, Vec<String>>,
}

impl AliasMap {
    /// Build a normalized alias map from raw phrase dictionaries.
    ///
    /// `two_way`: {x: [y, ...]} means every normalized variant of x maps to
    /// every normalized variant of every y, vice versa, and every normalized
    /// variant of a given y maps to every other normalized variant of that y
    /// (to preserve join-char variants across the equivalence).
    ///
    /// `one_way`: {x: [y, ...]} means every normalized variant of x maps to
    /// every normalized variant of every y; no reverse edges.
    pub fn build(
        normalizer: &Normalizer,
        two_way: &HashMap<String, Vec<String>>,
        one_way: &HashMap<String, Vec<String>>,
    ) -> Self {
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut add_edge = |edges: &mut HashMap<String, Vec<String>>, from: String, to: String| {
            if from == to {
                return;
            }
            let list = edges.entry(from).or_default();
            if !list.contains(&to) {
                list.push(to);
            }
        };

        for (x, ys) in two_way {
            let norm_xs = normalizer.normalize(x);
            let mut norm_ys = Vec::new();
            for y in ys {
                norm_ys.extend(normalizer.normalize(y));
            }

            for nx in &norm_xs {
                for ny in &norm_ys {
                    add_edge(&mut edges, nx.clone(), ny.clone());
                    add_edge(&mut edges, ny.clone(), nx.clone());
                }
            }
            // Every normalized variant of y maps to every other normalized
            // variant of y, preserving join-char equivalence across the pair.
            for ny_a in &norm_ys {
                for ny_b in &norm_ys {
                    add_edge(&mut edges, ny_a.clone(), ny_b.clone());
                }
            }
        }

        for (x, ys) in one_way {
            let norm_xs = normalizer.normalize(x);
            let mut norm_ys = Vec::new();
            for y in ys {
                norm_ys.extend(normalizer.normalize(y));
            }
            for nx in &norm_xs {
                for ny in &norm_ys {
                    add_edge(&mut edges, nx.clone(), ny.clone());
                }
            }
        }

        Self { edges }
    }

    fn replacements_for(&self, phrase: &str) -> Option<&[String]> {
        self.edges.get(phrase).map(|v| v.as_slice())
    }

    /// Expand `term` into the set of every term reachable by repeated,
    /// non-overlapping alias substitution. Always includes `term` itself.
    /// Terminates: each pushed term strictly extends its parent's aliased
    /// range set, and total ranges for an n-word term are bounded by O(n^2).
    pub fn expand(&self, term: &str) -> HashSet<String> {
        let words: Vec<&str> = term.split(' ').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            let mut out = HashSet::new();
            out.insert(term.to_string());
            return out;
        }

        let mut seen: HashMap<String, Vec<Range>> = HashMap::new();
        seen.insert(term.to_string(), Vec::new());
        let mut stack: Vec<(String, Vec<Range>)> = vec![(term.to_string(), Vec::new())];

        while let Some((t, ranges)) = stack.pop() {
            let t_words: Vec<&str> = t.split(' ').filter(|w| !w.is_empty()).collect();
            let n = t_words.len();

            for i in 0..n {
                for j in (i + 1)..=n {
                    if overlaps((i, j), &ranges) {
                        continue;
                    }
                    let sub_phrase = t_words[i..j].join(" ");
                    let Some(replacements) = self.replacements_for(&sub_phrase) else {
                        continue;
                    };

                    for replacement in replacements {
                        let mut spliced: Vec<&str> = Vec::with_capacity(n - (j - i) + 1);
                        spliced.extend_from_slice(&t_words[..i]);
                        spliced.push(replacement.as_str());
                        spliced.extend_from_slice(&t_words[j..]);
                        let candidate = spliced.join(" ");
                        // Re-split because `replacement` may itself be multi-word,
                        // which shifts subsequent word indices.
                        let candidate_words: Vec<&str> =
                            candidate.split(' ').filter(|w| !w.is_empty()).collect();
                        let replacement_len = replacement.split(' ').filter(|w| !w.is_empty()).count();
                        let new_range: Range = (i, i + replacement_len);

                        if seen.contains_key(&candidate) {
                            continue;
                        }

                        let mut new_ranges = ranges.clone();
                        new_ranges.push(new_range);
                        let _ = candidate_words;

                        seen.insert(candidate.clone(), new_ranges.clone());
                        stack.push((candidate, new_ranges));
                    }
                }
            }
        }

        seen.into_keys().collect()
    }
}

fn overlaps(candidate: Range, existing: &[Range]) -> bool {
    existing
        .iter()
        .any(|&(s, e)| candidate.0 < e && s < candidate.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_map(two_way: &[(&str, &[&str])], one_way: &[(&str, &[&str])]) -> AliasMap {
        let normalizer = Normalizer::default();
        let two_way = two_way
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        let one_way = one_way
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        AliasMap::build(&normalizer, &two_way, &one_way)
    }

    #[test]
    fn two_way_expands_both_directions() {
        let map = alias_map(&[("United States", &["US", "USA", "America"])], &[]);
        let expanded = map.expand("us consumer price index");
        assert!(expanded.contains("united states consumer price index"));

        let expanded2 = map.expand("united states consumer price index");
        assert!(expanded2.contains("us consumer price index"));
        assert!(expanded2.contains("usa consumer price index"));
        assert!(expanded2.contains("america consumer price index"));
    }

    #[test]
    fn one_way_does_not_reverse() {
        let map = alias_map(&[], &[("nyc", &["new york city"])]);
        let expanded = map.expand("nyc marathon");
        assert!(expanded.contains("new york city marathon"));

        let reverse = map.expand("new york city marathon");
        assert!(!reverse.contains("nyc marathon"));
    }

    #[test]
    fn no_double_alias_chain() {
        let map = alias_map(&[("California", &["CA"]), ("Canada", &["CA"])], &[]);
        let expanded = map.expand("california unemployment");
        // california -> ca is one hop; ca -> canada would be a second hop
        // through the same range and must not happen.
        assert!(!expanded.contains("canada unemployment"));
        assert!(expanded.contains("ca unemployment"));
    }

    #[test]
    fn expansion_always_includes_original() {
        let map = alias_map(&[], &[]);
        let expanded = map.expand("plain term");
        assert_eq!(expanded.len(), 1);
        assert!(expanded.contains("plain term"));
    }

    #[test]
    fn expansion_terminates_on_self_referential_alias() {
        let map = alias_map(&[("a", &["b"]), ("b", &["a"])], &[]);
        let expanded = map.expand("a");
        assert!(expanded.contains("a"));
        assert!(expanded.contains("b"));
        assert_eq!(expanded.len(), 2);
    }
}
