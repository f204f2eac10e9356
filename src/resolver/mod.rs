//! Cross-source product-name entity resolution.
//!
//! Matches a free-text source product name against canonical product
//! candidates using, in order of strength: the synonym dictionary, direct
//! edit-distance similarity, and token overlap. Runs once per catalog
//! sync, not per price point.

pub mod dictionary;

pub use dictionary::SynonymDictionary;

use crate::domain::{MatchCandidate, MatchType, ProductCandidate};
use strsim::normalized_levenshtein;

/// Minimum best score for a match to be accepted.
pub const ACCEPT_SCORE: i64 = 50;

/// Pairwise token similarity (percent) above which two tokens count as
/// the same word.
const TOKEN_SIMILARITY_FLOOR: f64 = 80.0;

/// Resolve a source product name against the candidate list.
///
/// Every candidate is scored and the maximum kept; a best score below
/// [`ACCEPT_SCORE`] reports the name as unmatched. On equal top scores the
/// first candidate in input order wins, so callers should supply
/// candidates in a stable order (the repository orders by ascending id).
pub fn resolve(
    source_name: &str,
    candidates: &[ProductCandidate],
    dict: &SynonymDictionary,
) -> MatchCandidate {
    let mut best_score = 0i64;
    let mut best_product = None;
    let mut best_type = MatchType::None;

    for candidate in candidates {
        let (score, match_type) = score_candidate(source_name, candidate, dict);
        if score > best_score {
            best_score = score;
            best_product = Some(candidate.id);
            best_type = match_type;
        }
    }

    if best_score >= ACCEPT_SCORE {
        MatchCandidate {
            source_name: source_name.to_string(),
            product_id: best_product,
            score: best_score,
            match_type: best_type,
        }
    } else {
        MatchCandidate::unmatched(source_name)
    }
}

/// Score one candidate across all match strategies, keeping the maximum.
fn score_candidate(
    source_name: &str,
    candidate: &ProductCandidate,
    dict: &SynonymDictionary,
) -> (i64, MatchType) {
    let mut score = 0i64;
    let mut match_type = MatchType::None;

    if let Some(s) = dictionary_score(source_name, &candidate.local_name, dict) {
        score = s;
        match_type = MatchType::Dictionary;
    }

    if let Some(name_en) = &candidate.local_name_en {
        let direct = similarity_pct(source_name, name_en);
        if direct > score {
            score = direct;
            match_type = MatchType::Fuzzy;
        }

        let token = token_overlap_score(source_name, name_en);
        if token > score {
            score = token;
            match_type = MatchType::Token;
        }
    } else {
        // No source-language name: token overlap against the local name is
        // still worth trying for bilingual listings.
        let token = token_overlap_score(source_name, &candidate.local_name);
        if token > score {
            score = token;
            match_type = MatchType::Token;
        }
    }

    (score, match_type)
}

/// Dictionary match: 100 when the source name contains, or is contained
/// by, a synonym of the candidate's local term; 95 when the source name
/// carries a synonym whose canonical term merely appears inside the
/// candidate's local name.
fn dictionary_score(
    source_name: &str,
    local_name: &str,
    dict: &SynonymDictionary,
) -> Option<i64> {
    let source = source_name.trim().to_lowercase();
    let local = local_name.trim().to_lowercase();

    if let Some(synonyms) = dict.synonyms(&local) {
        for synonym in synonyms {
            if source.contains(synonym.as_str()) || synonym.contains(&source) {
                return Some(100);
            }
        }
    }

    for (term, synonyms) in dict.iter() {
        if local.contains(term) && synonyms.iter().any(|s| source.contains(s.as_str())) {
            return Some(95);
        }
    }

    None
}

/// Normalized edit-distance similarity scaled to 0..=100.
fn similarity_pct(a: &str, b: &str) -> i64 {
    let sim = normalized_levenshtein(&a.trim().to_lowercase(), &b.trim().to_lowercase());
    (sim * 100.0).round() as i64
}

/// Token overlap: matched tokens over the larger token count, in percent.
fn token_overlap_score(a: &str, b: &str) -> i64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0;
    }

    let matched = tokens_a
        .iter()
        .filter(|ta| {
            tokens_b.iter().any(|tb| {
                ta.as_str() == tb.as_str()
                    || normalized_levenshtein(ta, tb) * 100.0 > TOKEN_SIMILARITY_FLOOR
            })
        })
        .count();

    let denominator = tokens_a.len().max(tokens_b.len());
    ((matched as f64 / denominator as f64) * 100.0).round() as i64
}

/// Split on whitespace, hyphens, underscores, and commas; keep tokens
/// longer than 2 characters, lowercased.
fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == ',')
        .filter(|t| t.chars().count() > 2)
        .map(|t| t.to_string())
        .collect()
}
