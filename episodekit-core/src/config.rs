//! Serializable dataset, parsing and sampling configuration.
//!
//! A [`DatasetConfig`] is read once (usually from TOML), validated, and then
//! passed by value to the sampler. Every field has a default so partial
//! files are accepted.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SamplingError};
use crate::feed::FeedColumns;

/// A calendar-free duration expressed as days, hours and minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodSpec {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl PeriodSpec {
    pub fn new(days: i64, hours: i64, minutes: i64) -> Self {
        Self {
            days,
            hours,
            minutes,
        }
    }

    pub fn minutes(minutes: i64) -> Self {
        Self::new(0, 0, minutes)
    }

    pub fn hours(hours: i64) -> Self {
        Self::new(0, hours, 0)
    }

    pub fn days(days: i64) -> Self {
        Self::new(days, 0, 0)
    }

    /// Fails with [`SamplingError::InvalidConfig`] when a component or the
    /// sum is outside chrono's `Duration` range.
    pub fn to_duration(&self) -> Result<Duration> {
        Duration::try_days(self.days)
            .zip(Duration::try_hours(self.hours))
            .zip(Duration::try_minutes(self.minutes))
            .and_then(|((d, h), m)| d.checked_add(&h)?.checked_add(&m))
            .ok_or_else(|| SamplingError::InvalidConfig(format!("period {self:?} is out of range")))
    }

    pub fn total_seconds(&self) -> Result<i64> {
        Ok(self.to_duration()?.num_seconds())
    }

    fn is_negative(&self) -> Result<bool> {
        Ok(self.total_seconds()? < 0)
    }
}

/// How raw source files are turned into a series.
///
/// Defaults parse 1-minute generic ASCII bars as distributed by HistData:
/// `20170102 170000;1.0520;1.0523;1.0518;1.0521;0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub separator: char,
    pub has_header: bool,
    /// chrono format string for the first (datetime) field.
    pub datetime_format: String,
    /// Names of the fields following the datetime field, in file order.
    pub columns: Vec<String>,
    /// Column roles used when converting a series into a feed.
    pub feed: FeedColumns,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            separator: ';',
            has_header: false,
            datetime_format: "%Y%m%d %H%M%S".into(),
            columns: vec![
                "open".into(),
                "high".into(),
                "low".into(),
                "close".into(),
                "volume".into(),
            ],
            feed: FeedColumns::default(),
        }
    }
}

impl ParsingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.separator.is_ascii() {
            return Err(SamplingError::InvalidConfig(format!(
                "separator must be a single ASCII character, got {:?}",
                self.separator
            )));
        }
        for required in ["open", "high", "low", "close"] {
            if !self.columns.iter().any(|c| c == required) {
                return Err(SamplingError::InvalidConfig(format!(
                    "missing required column '{required}' in {:?}",
                    self.columns
                )));
            }
        }
        self.feed.validate()
    }
}

/// Episode geometry and start constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Allowed start weekdays, 0 = Monday .. 6 = Sunday. Empty allows none.
    pub start_weekdays: Vec<u8>,
    /// Move the episode start to the first record of the candidate's day.
    pub start_at_midnight: bool,
    /// Nominal episode duration.
    pub sample_duration: PeriodSpec,
    /// Maximum tolerated excess of realized over nominal episode duration.
    pub time_gap: PeriodSpec,
    /// Duration reserved at the end of the series for test episodes.
    pub test_period: PeriodSpec,
    /// Minutes represented by one row.
    pub timeframe_minutes: u32,
    /// Candidate starts drawn per sampling call before giving up.
    pub max_attempts: usize,
    /// Base name of produced episodes.
    pub episode_name: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            start_weekdays: vec![0, 1, 2, 3],
            start_at_midnight: true,
            sample_duration: PeriodSpec::new(1, 23, 55),
            time_gap: PeriodSpec::hours(5),
            test_period: PeriodSpec::default(),
            timeframe_minutes: 1,
            max_attempts: 100,
            episode_name: "data_stream".into(),
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeframe_minutes == 0 {
            return Err(SamplingError::InvalidConfig(
                "timeframe_minutes must be positive".into(),
            ));
        }
        if let Some(day) = self.start_weekdays.iter().find(|&&d| d > 6) {
            return Err(SamplingError::InvalidConfig(format!(
                "start weekday {day} out of range 0..=6"
            )));
        }
        if self.sample_duration.is_negative()?
            || self.time_gap.is_negative()?
            || self.test_period.is_negative()?
        {
            return Err(SamplingError::InvalidConfig(
                "durations must not be negative".into(),
            ));
        }
        let row_secs = 60 * i64::from(self.timeframe_minutes);
        if self.sample_duration.total_seconds()? < row_secs {
            return Err(SamplingError::InvalidConfig(format!(
                "sample duration {:?} is shorter than one {}-minute row",
                self.sample_duration, self.timeframe_minutes
            )));
        }
        if self.max_attempts == 0 {
            return Err(SamplingError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// True when `weekday` (0 = Monday) may start an episode.
    pub fn allows_weekday(&self, weekday: u8) -> bool {
        self.start_weekdays.contains(&weekday)
    }
}

/// Limits for samplers built from episodes of this dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestingConfig {
    /// Deepest allowed nesting level; the root sampler is level 0.
    pub max_depth: usize,
    /// Sampling configuration for nested samplers. Falls back to the parent's.
    pub sampling: Option<SamplingConfig>,
}

impl Default for NestingConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            sampling: None,
        }
    }
}

/// Top-level configuration of one dataset instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub name: String,
    pub task: usize,
    /// Master seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub parsing: ParsingConfig,
    pub sampling: SamplingConfig,
    pub nesting: NestingConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: "base_data".into(),
            task: 0,
            seed: None,
            parsing: ParsingConfig::default(),
            sampling: SamplingConfig::default(),
            nesting: NestingConfig::default(),
        }
    }
}

impl DatasetConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: DatasetConfig = toml::from_str(s)
            .map_err(|e| SamplingError::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SamplingError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SamplingError::InvalidConfig(format!("failed to serialize: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        self.parsing.validate()?;
        self.sampling.validate()?;
        if let Some(nested) = &self.nesting.sampling {
            nested.validate()?;
        }
        Ok(())
    }
}

fn default_get_new() -> bool {
    true
}

fn default_beta_param() -> f64 {
    1.0
}

/// Options recognized by [`EpisodeSampler::sample`](crate::sampler::EpisodeSampler::sample).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRequest {
    #[serde(default = "default_get_new")]
    pub get_new: bool,
    /// 0 = train, 1 = test.
    #[serde(default)]
    pub sample_type: u8,
    #[serde(default = "default_beta_param")]
    pub beta_alpha: f64,
    #[serde(default = "default_beta_param")]
    pub beta_beta: f64,
}

impl Default for SampleRequest {
    fn default() -> Self {
        Self {
            get_new: true,
            sample_type: 0,
            beta_alpha: 1.0,
            beta_beta: 1.0,
        }
    }
}

impl SampleRequest {
    pub fn train() -> Self {
        Self::default()
    }

    pub fn test() -> Self {
        Self {
            sample_type: 1,
            ..Self::default()
        }
    }

    /// Skew the train start distribution, e.g. `(10.0, 0.8)` favours recent data.
    pub fn with_beta(mut self, alpha: f64, beta: f64) -> Self {
        self.beta_alpha = alpha;
        self.beta_beta = beta;
        self
    }

    /// Ask for the cached episode instead of a new one.
    pub fn reuse(mut self) -> Self {
        self.get_new = false;
        self
    }
}
