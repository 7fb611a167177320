//! EpisodeKit Core: episode sampling over ordered time series.
//!
//! This crate turns one long, timestamp-ordered OHLCV series into short
//! episodes for training and evaluating sequential decision agents:
//! - Series store with strictly ascending timestamps and nearest-row lookup
//! - Train/test partition planning with the test block at the end
//! - Constrained stochastic windowing (Beta-scaled starts, weekday filter,
//!   midnight alignment, gap tolerance, bounded retries)
//! - Lineage metadata and nested samplers built from episodes
//! - CSV ingestion, descriptive statistics and columnar feed export

pub mod config;
pub mod episode;
pub mod error;
pub mod factory;
pub mod feed;
pub mod ingest;
pub mod partition;
pub mod rng;
pub mod sampler;
pub mod series;
pub mod stats;

pub use config::{DatasetConfig, NestingConfig, ParsingConfig, PeriodSpec, SampleRequest, SamplingConfig};
pub use episode::{Anchor, Episode, EpisodeMetadata, EpisodeSummary, SampleKind};
pub use error::{Partition, Result, SamplingError};
pub use factory::{NestedParams, SampleFactory, SamplerFactory};
pub use feed::{to_feed, Feed, FeedColumns};
pub use ingest::{CsvIngestor, IngestError};
pub use partition::{PartitionPlan, PartitionPlanner, RowInterval};
pub use rng::SeedHierarchy;
pub use sampler::{EpisodeSampler, SamplerState};
pub use series::{Record, Series, SeriesStore};
pub use stats::{describe, ColumnSummary, DataSummary};
