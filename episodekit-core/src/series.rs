//! Series and SeriesStore: the master ordered dataset.

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplingError};

/// One OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Record {
    /// Weekday of the record, 0 = Monday .. 6 = Sunday.
    pub fn weekday(&self) -> u8 {
        self.timestamp.weekday().num_days_from_monday() as u8
    }

    /// Value of a numeric column by position: 0 = open .. 4 = volume.
    pub fn value(&self, column: usize) -> Option<f64> {
        match column {
            0 => Some(self.open),
            1 => Some(self.high),
            2 => Some(self.low),
            3 => Some(self.close),
            4 => Some(self.volume),
            _ => None,
        }
    }
}

/// Names of the numeric columns, in [`Record::value`] order.
pub const VALUE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Records with strictly ascending timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    records: Vec<Record>,
}

impl Series {
    /// Build a series, rejecting duplicate or descending timestamps.
    pub fn new(records: Vec<Record>) -> Result<Self> {
        if let Some(row) = records
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(SamplingError::Unordered { row: row + 1 });
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn first(&self) -> Option<&Record> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Owned copy of rows `[low, high)`. Callers check bounds.
    pub(crate) fn slice(&self, low: usize, high: usize) -> Series {
        Series {
            records: self.records[low..high].to_vec(),
        }
    }

    /// Duration between the first and the last record.
    pub fn time_span(&self) -> Option<Duration> {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => Some(last.timestamp - first.timestamp),
            _ => None,
        }
    }

    /// Row whose timestamp is closest to `ts`; ties resolve to the earlier row.
    pub fn nearest_row(&self, ts: NaiveDateTime) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }
        let after = self.records.partition_point(|r| r.timestamp < ts);
        if after == 0 {
            return Some(0);
        }
        if after == self.records.len() {
            return Some(after - 1);
        }
        let before = after - 1;
        let d_before = ts - self.records[before].timestamp;
        let d_after = self.records[after].timestamp - ts;
        if d_after < d_before {
            Some(after)
        } else {
            Some(before)
        }
    }
}

/// Owner of the loaded series. Empty until [`SeriesStore::load`].
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    series: Option<Series>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held series.
    pub fn load(&mut self, series: Series) {
        self.series = Some(series);
    }

    pub fn clear(&mut self) {
        self.series = None;
    }

    /// True when a non-empty series is held.
    pub fn is_loaded(&self) -> bool {
        self.series.as_ref().is_some_and(|s| !s.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.series.as_ref().map_or(0, Series::len)
    }

    pub fn series(&self) -> Result<&Series> {
        match &self.series {
            Some(series) if !series.is_empty() => Ok(series),
            _ => Err(SamplingError::EmptyData),
        }
    }

    pub fn rows_in_range(&self, low: usize, high: usize) -> Result<Series> {
        let series = self.series()?;
        if low > high || high > series.len() {
            return Err(SamplingError::RowOutOfRange {
                row: high.max(low),
                row_count: series.len(),
            });
        }
        Ok(series.slice(low, high))
    }

    pub fn nearest_row_for_timestamp(&self, ts: NaiveDateTime) -> Result<usize> {
        self.series()?.nearest_row(ts).ok_or(SamplingError::EmptyData)
    }

    pub fn record_at(&self, row: usize) -> Result<&Record> {
        let series = self.series()?;
        series.get(row).ok_or(SamplingError::RowOutOfRange {
            row,
            row_count: series.len(),
        })
    }

    pub fn timestamp_at(&self, row: usize) -> Result<NaiveDateTime> {
        Ok(self.record_at(row)?.timestamp)
    }

    pub fn weekday_at(&self, row: usize) -> Result<u8> {
        Ok(self.record_at(row)?.weekday())
    }

    pub fn time_span(&self) -> Result<Duration> {
        self.series()?.time_span().ok_or(SamplingError::EmptyData)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    pub fn record_at(timestamp: NaiveDateTime, price: f64) -> Record {
        Record {
            timestamp,
            open: price,
            high: price + 0.5,
            low: price - 0.5,
            close: price + 0.25,
            volume: 100.0,
        }
    }

    /// `n` one-minute records starting at `start`.
    pub fn minute_series(start: NaiveDateTime, n: usize) -> Series {
        let records = (0..n)
            .map(|i| record_at(start + Duration::minutes(i as i64), 100.0 + i as f64 * 0.01))
            .collect();
        Series::new(records).unwrap()
    }

    /// Monday 2024-01-01 00:00.
    pub fn monday() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }
}
