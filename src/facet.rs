//! Facet expressions and their canonical hash (see `spec.md` §4.7).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Combination type for the key/value pairs inside one facet-dict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetType {
    And,
    Or,
}

impl FacetType {
    fn as_str(self) -> &'static str {
        match self {
            FacetType::And => "and",
            FacetType::Or => "or",
        }
    }
}

/// One (key, value) condition within a facet-dict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetPair {
    pub key: String,
    pub value: String,
}

/// One facet-dict: a combination type plus a non-empty list of key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDict {
    #[serde(rename = "type")]
    pub kind: FacetType,
    pub facets: Vec<FacetPair>,
}

/// An ordered sequence of facet-dicts, as accepted by `suggest`/`exact_suggest`.
pub type FacetExpression = Vec<FacetDict>;

/// Validate the shape required by `spec.md` §4.7: every facet-dict must have
/// a non-empty `facets` list.
pub fn validate(expr: &FacetExpression) -> Result<()> {
    if expr.is_empty() {
        return Ok(());
    }
    for dict in expr {
        if dict.facets.is_empty() {
            return Err(Error::InvalidFacetExpression(
                "facet-dict must contain at least one key/value pair".to_string(),
            ));
        }
        for pair in &dict.facets {
            if pair.key.is_empty() || pair.value.is_empty() {
                return Err(Error::InvalidFacetExpression(
                    "facet key and value must be non-empty".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Every facet key referenced anywhere in the expression.
pub fn referenced_keys(expr: &FacetExpression) -> Vec<String> {
    let mut keys: Vec<String> = expr
        .iter()
        .flat_map(|dict| dict.facets.iter().map(|p| p.key.clone()))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Canonical, order-insensitive hash of a facet expression.
///
/// Two expressions with identical (type, {key,value}) content, regardless of
/// the ordering of the inner pair list or the outer dict sequence, hash to
/// the same value. Changing any type, key, or value changes the hash.
pub fn hash(expr: &FacetExpression) -> String {
    if expr.is_empty() {
        return "noop".to_string();
    }

    let mut dict_hashes: Vec<String> = expr
        .iter()
        .map(|dict| {
            let mut pairs: Vec<String> = dict
                .facets
                .iter()
                .map(|p| format!("{}={}", p.key, p.value))
                .collect();
            pairs.sort();
            let canonical = format!("{}:{}", dict.kind.as_str(), pairs.join(","));
            sha256_hex(&canonical)
        })
        .collect();
    dict_hashes.sort();

    sha256_hex(&dict_hashes.join("|"))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
