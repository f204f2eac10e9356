//! Product name matching types used by the entity resolver.

use serde::{Deserialize, Serialize};

/// How a source product name was matched to a canonical product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Dictionary,
    Fuzzy,
    Token,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Dictionary => "dictionary",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Token => "token",
            MatchType::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dictionary" => Some(MatchType::Dictionary),
            "fuzzy" => Some(MatchType::Fuzzy),
            "token" => Some(MatchType::Token),
            "none" => Some(MatchType::None),
            _ => None,
        }
    }
}

/// A canonical product offered to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCandidate {
    pub id: i64,
    /// Local-language name (e.g. "alma").
    pub local_name: String,
    /// English name when known (e.g. "Apple").
    pub local_name_en: Option<String>,
}

/// Resolution outcome for one source product name.
///
/// Consumed once to set a persistent link; not retained as a time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub source_name: String,
    /// Matched canonical product, `None` when unmatched.
    pub product_id: Option<i64>,
    /// Score in 0..=100.
    pub score: i64,
    pub match_type: MatchType,
}

impl MatchCandidate {
    pub fn unmatched(source_name: &str) -> Self {
        MatchCandidate {
            source_name: source_name.to_string(),
            product_id: None,
            score: 0,
            match_type: MatchType::None,
        }
    }
}
