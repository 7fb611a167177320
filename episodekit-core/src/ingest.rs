//! CSV ingestion: delimited source files into one ascending series.
//!
//! Files are read in the given order and concatenated. A timestamp already
//! seen is dropped (first occurrence wins); a timestamp older than the last
//! kept one is an error.

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ParsingConfig;
use crate::error::{Result, SamplingError};
use crate::series::{Record, Series};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("data file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("{}:{line}: timestamp {current} precedes {previous}", path.display())]
    Unordered {
        path: PathBuf,
        line: u64,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("no records found in {files} file(s)")]
    Empty { files: usize },
}

/// Field positions of the value columns within a record.
#[derive(Debug, Clone, Copy)]
struct Layout {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Layout {
    /// Positions are offset by one for the leading datetime field.
    fn from_columns(columns: &[String]) -> Option<Self> {
        let find = |name: &str| columns.iter().position(|c| c == name).map(|i| i + 1);
        Some(Self {
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume"),
        })
    }
}

pub struct CsvIngestor {
    config: ParsingConfig,
}

impl CsvIngestor {
    pub fn new(config: ParsingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Read and concatenate `paths` into one series.
    pub fn read(&self, paths: &[PathBuf]) -> Result<Series> {
        self.config.validate()?;
        let layout = Layout::from_columns(&self.config.columns).ok_or_else(|| {
            SamplingError::InvalidConfig(
                "columns must name open, high, low and close".into(),
            )
        })?;

        let mut records: Vec<Record> = Vec::new();
        let mut seen: HashSet<NaiveDateTime> = HashSet::new();
        let mut duplicates = 0usize;

        for path in paths {
            let before = records.len();
            let dropped = self.read_file(path, layout, &mut records, &mut seen)?;
            duplicates += dropped;
            info!(
                "loaded {} records from {}",
                records.len() - before,
                path.display()
            );
        }

        if duplicates > 0 {
            warn!("found {duplicates} duplicated timestamps, dropped (first occurrence kept)");
        }
        if records.is_empty() {
            return Err(IngestError::Empty { files: paths.len() }.into());
        }
        Series::new(records)
    }

    /// Appends the file's records; returns the number of duplicates dropped.
    fn read_file(
        &self,
        path: &Path,
        layout: Layout,
        records: &mut Vec<Record>,
        seen: &mut HashSet<NaiveDateTime>,
    ) -> std::result::Result<usize, IngestError> {
        if !path.is_file() {
            return Err(IngestError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.separator as u8)
            .has_headers(self.config.has_header)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(|source| IngestError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

        let mut dropped = 0;
        for row in reader.records() {
            let row = row.map_err(|source| IngestError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let line = row.position().map_or(0, |p| p.line());
            if row.iter().all(str::is_empty) {
                continue;
            }
            let record = self
                .parse_row(&row, layout)
                .map_err(|reason| IngestError::Parse {
                    path: path.to_path_buf(),
                    line,
                    reason,
                })?;

            if !seen.insert(record.timestamp) {
                dropped += 1;
                continue;
            }
            if let Some(last) = records.last() {
                if record.timestamp < last.timestamp {
                    return Err(IngestError::Unordered {
                        path: path.to_path_buf(),
                        line,
                        previous: last.timestamp,
                        current: record.timestamp,
                    });
                }
            }
            records.push(record);
        }
        Ok(dropped)
    }

    fn parse_row(&self, row: &StringRecord, layout: Layout) -> std::result::Result<Record, String> {
        let raw_ts = row.get(0).ok_or("missing datetime field")?;
        let timestamp = parse_timestamp(raw_ts, &self.config.datetime_format)?;
        let value = |idx: usize| -> std::result::Result<f64, String> {
            let raw = row
                .get(idx)
                .ok_or_else(|| format!("missing field {idx}"))?;
            raw.parse::<f64>()
                .map_err(|e| format!("field {idx} ({raw:?}): {e}"))
        };
        Ok(Record {
            timestamp,
            open: value(layout.open)?,
            high: value(layout.high)?,
            low: value(layout.low)?,
            close: value(layout.close)?,
            volume: match layout.volume {
                Some(idx) => value(idx)?,
                None => 0.0,
            },
        })
    }
}

/// Full datetime first, then a bare date at midnight.
fn parse_timestamp(raw: &str, format: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, format)
        .or_else(|_| NaiveDate::parse_from_str(raw, format).map(|d| d.and_time(chrono::NaiveTime::MIN)))
        .map_err(|e| format!("cannot parse {raw:?} with format {format:?}: {e}"))
}
