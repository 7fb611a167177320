//! Columnar feed export of a series or episode.
//!
//! Source positions index the series layout:
//! `0 = datetime, 1 = open, 2 = high, 3 = low, 4 = close, 5 = volume`.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, SamplingError};
use crate::series::Series as RecordSeries;

/// Highest valid source position.
const LAST_SOURCE: usize = 5;

/// Role to source-position mapping. `None` marks a role as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedColumns {
    pub datetime: Option<usize>,
    pub open: Option<usize>,
    pub high: Option<usize>,
    pub low: Option<usize>,
    pub close: Option<usize>,
    pub volume: Option<usize>,
    pub openinterest: Option<usize>,
}

impl Default for FeedColumns {
    fn default() -> Self {
        Self {
            datetime: Some(0),
            open: Some(1),
            high: Some(2),
            low: Some(3),
            close: Some(4),
            volume: None,
            openinterest: None,
        }
    }
}

impl FeedColumns {
    /// Present value roles, in output order.
    fn value_roles(&self) -> Vec<(&'static str, usize)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
            ("openinterest", self.openinterest),
        ]
        .into_iter()
        .filter_map(|(name, pos)| pos.map(|p| (name, p)))
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.datetime != Some(0) {
            return Err(SamplingError::InvalidConfig(format!(
                "feed datetime role must reference position 0, got {:?}",
                self.datetime
            )));
        }
        for (name, pos) in self.value_roles() {
            if pos == 0 || pos > LAST_SOURCE {
                return Err(SamplingError::InvalidConfig(format!(
                    "feed role '{name}' references position {pos}, expected 1..={LAST_SOURCE}"
                )));
            }
        }
        Ok(())
    }
}

/// A series laid out as a polars frame with a millisecond datetime column.
#[derive(Debug, Clone)]
pub struct Feed {
    pub frame: DataFrame,
    pub timeframe_minutes: u32,
    pub num_records: usize,
}

impl Feed {
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .map_err(|e| SamplingError::Feed(format!("create {}: {e}", path.display())))?;
        ParquetWriter::new(file).finish(&mut self.frame.clone())?;
        Ok(())
    }
}

pub fn to_feed(series: &RecordSeries, columns: &FeedColumns, timeframe_minutes: u32) -> Result<Feed> {
    if series.is_empty() {
        return Err(SamplingError::EmptyData);
    }
    columns.validate()?;

    let millis: Vec<i64> = series
        .records()
        .iter()
        .map(|r| r.timestamp.and_utc().timestamp_millis())
        .collect();
    let mut frame_columns = vec![Column::new("datetime".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?];

    for (name, pos) in columns.value_roles() {
        let values: Vec<f64> = series
            .records()
            .iter()
            .map(|r| r.value(pos - 1).unwrap_or(f64::NAN))
            .collect();
        frame_columns.push(Column::new(name.into(), values));
    }

    let frame = DataFrame::new(frame_columns)?;
    Ok(Feed {
        num_records: frame.height(),
        frame,
        timeframe_minutes,
    })
}
