//! Descriptive statistics of the numeric columns of a series.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SamplingError};
use crate::series::{Series as RecordSeries, VALUE_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single row.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

impl DataSummary {
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}", "")?;
        for column in &self.columns {
            write!(f, "{:>14}", column.name)?;
        }
        writeln!(f)?;

        let rows: [(&str, fn(&ColumnSummary) -> f64); 8] = [
            ("count", |c| c.count as f64),
            ("mean", |c| c.mean),
            ("std", |c| c.std),
            ("min", |c| c.min),
            ("25%", |c| c.q25),
            ("50%", |c| c.q50),
            ("75%", |c| c.q75),
            ("max", |c| c.max),
        ];
        for (label, get) in rows {
            write!(f, "{label:<8}")?;
            for column in &self.columns {
                write!(f, "{:>14.6}", get(column))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Numeric columns of `series` as a frame, one column per [`VALUE_COLUMNS`] entry.
fn values_frame(series: &RecordSeries) -> PolarsResult<DataFrame> {
    let columns = VALUE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<f64> = series
                .records()
                .iter()
                .map(|r| r.value(i).unwrap_or(f64::NAN))
                .collect();
            Column::new((*name).into(), values)
        })
        .collect();
    DataFrame::new(columns)
}

/// Linear interpolation between closest ranks over sorted `values`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn describe(series: &RecordSeries) -> Result<DataSummary> {
    if series.is_empty() {
        return Err(SamplingError::EmptyData);
    }
    let frame = values_frame(series)?;

    let mut columns = Vec::with_capacity(VALUE_COLUMNS.len());
    for name in VALUE_COLUMNS {
        let ca = frame.column(name)?.f64()?;
        let mut sorted: Vec<f64> = ca.into_no_null_iter().collect();
        sorted.sort_by(f64::total_cmp);

        columns.push(ColumnSummary {
            name: name.to_string(),
            count: ca.len() - ca.null_count(),
            mean: ca.mean().unwrap_or(f64::NAN),
            std: if sorted.len() > 1 {
                ca.std(1).unwrap_or(f64::NAN)
            } else {
                f64::NAN
            },
            min: ca.min().unwrap_or(f64::NAN),
            q25: quantile(&sorted, 0.25),
            q50: quantile(&sorted, 0.50),
            q75: quantile(&sorted, 0.75),
            max: ca.max().unwrap_or(f64::NAN),
        });
    }

    Ok(DataSummary {
        rows: frame.height(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::{monday, record_at};

    fn series_of(prices: &[f64]) -> RecordSeries {
        let records = prices
            .iter()
            .enumerate()
            .map(|(i, p)| record_at(monday() + chrono::Duration::minutes(i as i64), *p))
            .collect();
        RecordSeries::new(records).unwrap()
    }

    #[test]
    fn matches_pandas_describe() {
        let summary = describe(&series_of(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let open = summary.column("open").unwrap();
        assert_eq!(open.count, 4);
        assert!((open.mean - 2.5).abs() < 1e-12);
        assert!((open.std - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(open.min, 1.0);
        assert!((open.q25 - 1.75).abs() < 1e-12);
        assert!((open.q50 - 2.5).abs() < 1e-12);
        assert!((open.q75 - 3.25).abs() < 1e-12);
        assert_eq!(open.max, 4.0);

        let volume = summary.column("volume").unwrap();
        assert!(volume.std.abs() < 1e-12);
    }

    #[test]
    fn single_row_has_nan_std() {
        let summary = describe(&series_of(&[5.0])).unwrap();
        let close = summary.column("close").unwrap();
        assert!(close.std.is_nan());
        assert_eq!(close.q25, 5.25);
    }

    #[test]
    fn display_lists_every_statistic() {
        let text = describe(&series_of(&[1.0, 2.0])).unwrap().to_string();
        for label in ["count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
            assert!(text.contains(label), "missing {label}");
        }
        assert!(text.contains("volume"));
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(
            describe(&RecordSeries::default()),
            Err(SamplingError::EmptyData)
        ));
    }
}
