//! Episode: a validated contiguous slice of the master series.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SamplingError;
use crate::series::Series;

/// Where an episode was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Train,
    Test,
    /// Unconstrained draw over the whole series.
    Random,
    /// Interval draw not yet tagged as train or test.
    Interval,
}

impl SampleKind {
    /// Numeric sample type used by requests: 0 = train, 1 = test.
    pub fn type_code(&self) -> Option<u8> {
        match self {
            SampleKind::Train => Some(0),
            SampleKind::Test => Some(1),
            SampleKind::Random | SampleKind::Interval => None,
        }
    }
}

impl TryFrom<u8> for SampleKind {
    type Error = SamplingError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SampleKind::Train),
            1 => Ok(SampleKind::Test),
            other => Err(SamplingError::InvalidSampleType(other)),
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SampleKind::Train => "train",
            SampleKind::Test => "test",
            SampleKind::Random => "random_sample",
            SampleKind::Interval => "interval_sample",
        };
        f.write_str(s)
    }
}

/// Lineage and placement of an episode.
///
/// The parent fields are back-references by value, not ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub kind: Option<SampleKind>,
    pub sample_index: u64,
    /// Absolute row in the parent series where the episode begins.
    pub first_row: usize,
    pub parent_sample_index: Option<u64>,
    pub parent_kind: Option<SampleKind>,
}

/// Timestamp the final window lookup was seeded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// Calendar midnight of the candidate record.
    Midnight(NaiveDate),
    /// The candidate record's own timestamp.
    Exact(NaiveDateTime),
}

impl Anchor {
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Anchor::Midnight(date) => date.and_time(chrono::NaiveTime::MIN),
            Anchor::Exact(ts) => *ts,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Midnight(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Anchor::Exact(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    id: String,
    anchor: Anchor,
    series: Series,
    metadata: EpisodeMetadata,
    depth: usize,
}

impl Episode {
    pub(crate) fn new(
        name: &str,
        anchor: Anchor,
        series: Series,
        metadata: EpisodeMetadata,
        depth: usize,
    ) -> Self {
        let id = format!("{name}n{}_at_{anchor}", metadata.sample_index);
        Self {
            id,
            anchor,
            series,
            metadata,
            depth,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn metadata(&self) -> &EpisodeMetadata {
        &self.metadata
    }

    /// Nesting level of the sampler that produced this episode.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut EpisodeMetadata {
        &mut self.metadata
    }

    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            id: self.id.clone(),
            kind: self.metadata.kind,
            sample_index: self.metadata.sample_index,
            parent_sample_index: self.metadata.parent_sample_index,
            parent_kind: self.metadata.parent_kind,
            first_row: self.metadata.first_row,
            rows: self.series.len(),
            start: self.series.first().map(|r| r.timestamp),
            end: self.series.last().map(|r| r.timestamp),
        }
    }
}

/// Serializable one-line description of an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: String,
    pub kind: Option<SampleKind>,
    pub sample_index: u64,
    pub parent_sample_index: Option<u64>,
    pub parent_kind: Option<SampleKind>,
    pub first_row: usize,
    pub rows: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}
