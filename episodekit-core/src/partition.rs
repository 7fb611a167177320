//! Train/test partition planning.
//!
//! Train rows always precede test rows:
//! `[0 <- train -> split) [split <- test -> row_count)`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{PeriodSpec, SamplingConfig};
use crate::error::{Partition, Result, SamplingError};

/// Half-open row range `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowInterval {
    pub low: usize,
    pub high: usize,
}

impl RowInterval {
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    /// Number of rows, zero for inverted intervals.
    pub fn len(&self) -> usize {
        self.high.saturating_sub(self.low)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, row: usize) -> bool {
        self.low <= row && row < self.high
    }
}

impl fmt::Display for RowInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.low, self.high)
    }
}

/// Result of a successful planning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub row_count: usize,
    pub episode_row_count: usize,
    pub train_row_count: usize,
    pub test_row_count: usize,
    pub train: RowInterval,
    pub test: RowInterval,
    pub episode_duration: Duration,
    pub gap_tolerance: Duration,
}

pub struct PartitionPlanner;

impl PartitionPlanner {
    /// Split `row_count` rows according to `config`.
    ///
    /// Fails with [`SamplingError::InsufficientData`] when the train subset, or
    /// a non-empty test subset, cannot hold one full episode.
    pub fn plan(row_count: usize, config: &SamplingConfig) -> Result<PartitionPlan> {
        if config.timeframe_minutes == 0 {
            return Err(SamplingError::InvalidConfig(
                "timeframe_minutes must be positive".into(),
            ));
        }
        let row_secs = 60 * i64::from(config.timeframe_minutes);

        let episode_row_count = floor_rows(&config.sample_duration, row_secs)?;
        let test_row_count = round_rows(&config.test_period, row_secs)?;
        let train_row_count = row_count.saturating_sub(test_row_count);

        if test_row_count > row_count || train_row_count < episode_row_count {
            return Err(SamplingError::InsufficientData {
                partition: Partition::Train,
                available: train_row_count,
                required: episode_row_count,
            });
        }
        if test_row_count > 0 && test_row_count < episode_row_count {
            return Err(SamplingError::InsufficientData {
                partition: Partition::Test,
                available: test_row_count,
                required: episode_row_count,
            });
        }

        Ok(PartitionPlan {
            row_count,
            episode_row_count,
            train_row_count,
            test_row_count,
            train: RowInterval::new(0, train_row_count),
            test: RowInterval::new(train_row_count, row_count),
            episode_duration: config.sample_duration.to_duration()?,
            gap_tolerance: config.time_gap.to_duration()?,
        })
    }
}

fn floor_rows(period: &PeriodSpec, row_secs: i64) -> Result<usize> {
    Ok((period.total_seconds()?.max(0) / row_secs) as usize)
}

/// Nearest whole number of rows, ties to even.
fn round_rows(period: &PeriodSpec, row_secs: i64) -> Result<usize> {
    let secs = period.total_seconds()?.max(0);
    let quotient = secs / row_secs;
    let remainder = secs % row_secs;
    let rounded = match (2 * remainder).cmp(&row_secs) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient % 2,
    };
    Ok(rounded as usize)
}
