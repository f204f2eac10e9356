//! Domain primitives: source feeds and trend statuses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Origin of a price observation.
///
/// Each feed has its own currency, unit vocabulary, product taxonomy, and
/// reporting cadence; everything downstream of normalization treats them
/// uniformly, keyed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFeed {
    /// National ministry of agriculture market feed.
    Ministry,
    /// Regional statistical office bulk archive.
    Regional,
    /// Global FAO producer-price archive.
    FaoProducer,
    /// Global retail/wholesale price-monitoring archive.
    FpmaRetail,
}

impl SourceFeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFeed::Ministry => "ministry",
            SourceFeed::Regional => "regional",
            SourceFeed::FaoProducer => "fao_producer",
            SourceFeed::FpmaRetail => "fpma_retail",
        }
    }

    pub fn parse(s: &str) -> Result<Self, FeedParseError> {
        match s {
            "ministry" => Ok(SourceFeed::Ministry),
            "regional" => Ok(SourceFeed::Regional),
            "fao_producer" => Ok(SourceFeed::FaoProducer),
            "fpma_retail" => Ok(SourceFeed::FpmaRetail),
            other => Err(FeedParseError(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source feed: {0}")]
pub struct FeedParseError(pub String);

/// Tri-state classification of a horizon change.
///
/// `Stable` covers both "within the band" and "no qualifying data point";
/// downstream consumers do not distinguish the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStatus {
    Increased,
    Decreased,
    Stable,
}

impl TrendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendStatus::Increased => "increased",
            TrendStatus::Decreased => "decreased",
            TrendStatus::Stable => "stable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "increased" => Some(TrendStatus::Increased),
            "decreased" => Some(TrendStatus::Decreased),
            "stable" => Some(TrendStatus::Stable),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_roundtrip() {
        for feed in [
            SourceFeed::Ministry,
            SourceFeed::Regional,
            SourceFeed::FaoProducer,
            SourceFeed::FpmaRetail,
        ] {
            assert_eq!(SourceFeed::parse(feed.as_str()).unwrap(), feed);
        }
    }

    #[test]
    fn feed_parse_rejects_unknown() {
        assert!(SourceFeed::parse("telegram").is_err());
    }

    #[test]
    fn feed_serializes_snake_case() {
        let json = serde_json::to_string(&SourceFeed::FpmaRetail).unwrap();
        assert_eq!(json, "\"fpma_retail\"");
    }

    #[test]
    fn status_roundtrip() {
        for status in [
            TrendStatus::Increased,
            TrendStatus::Decreased,
            TrendStatus::Stable,
        ] {
            assert_eq!(TrendStatus::parse(status.as_str()).unwrap(), status);
        }
        assert_eq!(TrendStatus::parse("sideways"), None);
    }
}
