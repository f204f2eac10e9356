//! Pure computation engine: series grouping and signal calculation.

pub mod series_builder;
pub mod signals;

pub use series_builder::{build_series, SeriesBatch};
pub use signals::compute_signal;
