//! Error taxonomy for loading, planning and sampling.
//!
//! Contract violations (`Invalid*`) fail fast and are never retried. Planning
//! failures (`InsufficientData`) are fatal to the load that produced them.
//! `SamplingExhausted` is the only error that depends on the random stream.

use thiserror::Error;

use crate::ingest::IngestError;
use crate::partition::RowInterval;

/// Which side of the train/test split a planning failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Train => write!(f, "train"),
            Partition::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("instance holds no data (hint: forgot to load a series?)")]
    EmptyData,

    #[error("row {row} out of range for dataset of {row_count} rows")]
    RowOutOfRange { row: usize, row_count: usize },

    #[error("series timestamps must be strictly ascending, violated at row {row}")]
    Unordered { row: usize },

    #[error("sampler is not ready (hint: forgot to call reset()?)")]
    NotReady,

    #[error(
        "{partition} subset should contain at least one episode, got {available} rows, episode needs {required} rows"
    )]
    InsufficientData {
        partition: Partition,
        available: usize,
        required: usize,
    },

    #[error("cannot sample {episode_rows} rows inside {interval} from dataset of {row_count} rows")]
    InvalidInterval {
        interval: RowInterval,
        episode_rows: usize,
        row_count: usize,
    },

    #[error("expected positive Beta distribution parameters, got alpha={alpha}, beta={beta}")]
    InvalidDistributionParam { alpha: f64, beta: f64 },

    #[error("expected sample type 0 (train) or 1 (test), got {0}")]
    InvalidSampleType(u8),

    #[error(
        "quitting after {attempts} sampling attempts (hint: check sampling params / dataset consistency, e.g. excluded weekdays or time gap tolerance)"
    )]
    SamplingExhausted { attempts: usize },

    #[error("nesting depth {depth} exceeds the factory limit of {max_depth}")]
    NestingTooDeep { depth: usize, max_depth: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("feed conversion failed: {0}")]
    Feed(String),
}

impl From<polars::error::PolarsError> for SamplingError {
    fn from(e: polars::error::PolarsError) -> Self {
        SamplingError::Feed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SamplingError>;
