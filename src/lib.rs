pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod orchestration;
pub mod resolver;

pub use config::Config;
pub use datasource::{ArchiveError, FpmaArchive, MockArchive, PriceArchive};
pub use db::{init_db, Repository};
pub use domain::{
    CanonicalKey, CanonicalSeries, Decimal, MatchCandidate, MatchType, PriceSignal, PricePoint,
    RawObservation, SourceFeed, TrendStatus,
};
pub use error::AppError;
pub use orchestration::{CatalogSync, RunSummary, SignalRunner};
