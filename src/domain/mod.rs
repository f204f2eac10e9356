//! Domain types for the price normalization and signal engine.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Source feed and trend status primitives
//! - Validated raw observations with stable identity keys
//! - Canonical series keys and normalized price points
//! - Signal and product-matching types

pub mod decimal;
pub mod matching;
pub mod observation;
pub mod primitives;
pub mod series;
pub mod signal;

pub use decimal::Decimal;
pub use matching::{MatchCandidate, MatchType, ProductCandidate};
pub use observation::{ObservationError, RawObservation};
pub use primitives::{FeedParseError, SourceFeed, TrendStatus};
pub use series::{CanonicalKey, CanonicalSeries, PricePoint};
pub use signal::{Horizon, PriceSignal};
