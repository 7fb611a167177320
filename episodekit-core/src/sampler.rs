//! EpisodeSampler: constrained stochastic windowing over a planned series.
//!
//! A sampler owns one series, plans its train/test split on every reset and
//! draws episodes from either side. Start rows are proposed from a scaled
//! Beta(alpha, beta) draw (or a uniform integer for [`EpisodeSampler::sample_random`])
//! and accepted only when:
//!
//! 1. the candidate record falls on an allowed weekday,
//! 2. the window snapped to the anchor stays inside the sampled interval and
//!    still starts on an allowed weekday,
//! 3. the realized window duration exceeds the nominal one by less than the
//!    configured time gap.
//!
//! Every proposal, whichever check rejects it, consumes one attempt from a
//! single budget of `max_attempts`.

use chrono::Duration;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{DatasetConfig, SampleRequest, SamplingConfig};
use crate::episode::{Anchor, Episode, EpisodeMetadata, SampleKind};
use crate::error::{Result, SamplingError};
use crate::factory::{NestedParams, SampleFactory};
use crate::feed::{to_feed, Feed, FeedColumns};
use crate::ingest::CsvIngestor;
use crate::partition::{PartitionPlan, PartitionPlanner, RowInterval};
use crate::rng::SeedHierarchy;
use crate::series::{Series, SeriesStore};
use crate::stats::{describe, DataSummary};

/// Lifecycle of a sampler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// No series, or the last planning pass failed.
    Unloaded,
    /// Series held, partition not computed yet.
    Loaded,
    /// Partition computed; sampling allowed.
    Ready,
}

#[derive(Debug)]
pub struct EpisodeSampler {
    name: String,
    task: usize,
    depth: usize,
    sampling: SamplingConfig,
    store: SeriesStore,
    plan: Option<PartitionPlan>,
    state: SamplerState,
    seeds: Option<SeedHierarchy>,
    rng: StdRng,
    sample_index: u64,
    /// This instance's own lineage, copied into episodes as their parent.
    metadata: EpisodeMetadata,
    cached: Option<Arc<Episode>>,
}

impl EpisodeSampler {
    /// Root sampler with no data. `seed = None` seeds from OS entropy.
    pub fn new(
        name: impl Into<String>,
        task: usize,
        sampling: SamplingConfig,
        seed: Option<u64>,
    ) -> Result<Self> {
        Self::with_lineage(
            name.into(),
            task,
            0,
            sampling,
            seed.map(SeedHierarchy::new),
            EpisodeMetadata::default(),
        )
    }

    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.name.clone(),
            config.task,
            config.sampling.clone(),
            config.seed,
        )
    }

    pub(crate) fn with_lineage(
        name: String,
        task: usize,
        depth: usize,
        sampling: SamplingConfig,
        seeds: Option<SeedHierarchy>,
        metadata: EpisodeMetadata,
    ) -> Result<Self> {
        sampling.validate()?;
        let rng = match &seeds {
            Some(hierarchy) => hierarchy.rng_for(&name, task, 0),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            name,
            task,
            depth,
            sampling,
            store: SeriesStore::new(),
            plan: None,
            state: SamplerState::Unloaded,
            seeds,
            rng,
            sample_index: 0,
            metadata,
            cached: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> usize {
        self.task
    }

    /// The task is part of a seeded sampler's stream, so the RNG is re-derived.
    pub fn set_task(&mut self, task: usize) {
        self.task = task;
        if let Some(seeds) = &self.seeds {
            self.rng = seeds.rng_for(&self.name, task, 0);
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Log prefix, `"{name}_{task}"`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.name, self.task)
    }

    /// Base name of produced episodes, `"{episode_name}_w_{task}_"`.
    pub fn sample_name(&self) -> String {
        format!("{}_w_{}_", self.sampling.episode_name, self.task)
    }

    pub fn sampling_config(&self) -> &SamplingConfig {
        &self.sampling
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SamplerState::Ready
    }

    pub fn plan(&self) -> Option<&PartitionPlan> {
        self.plan.as_ref()
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn metadata(&self) -> &EpisodeMetadata {
        &self.metadata
    }

    /// Number of episodes produced by [`EpisodeSampler::sample`] since the last reset.
    pub fn sample_count(&self) -> u64 {
        self.sample_index
    }

    pub fn cached_episode(&self) -> Option<&Arc<Episode>> {
        self.cached.as_ref()
    }

    /// Replace the series and re-plan the train/test split.
    ///
    /// Resets the sample counter and drops the cached episode. On planning
    /// failure the series is discarded and the sampler is left `Unloaded`.
    pub fn reset(&mut self, series: Series) -> Result<()> {
        self.cached = None;
        self.sample_index = 0;
        self.plan = None;

        if series.is_empty() {
            self.store.clear();
            self.state = SamplerState::Unloaded;
            error!("[{}] refusing to load an empty series", self.label());
            return Err(SamplingError::EmptyData);
        }

        self.store.load(series);
        self.state = SamplerState::Loaded;

        match PartitionPlanner::plan(self.store.row_count(), &self.sampling) {
            Ok(plan) => {
                info!(
                    "[{}] loaded {} rows spanning {}; train {}, test {}, episode {} rows",
                    self.label(),
                    plan.row_count,
                    self.store.time_span()?,
                    plan.train,
                    plan.test,
                    plan.episode_row_count,
                );
                self.plan = Some(plan);
                self.state = SamplerState::Ready;
                Ok(())
            }
            Err(e) => {
                error!("[{}] {e}", self.label());
                self.store.clear();
                self.state = SamplerState::Unloaded;
                Err(e)
            }
        }
    }

    /// Read `paths` with `ingestor` and reset, unless data is already held
    /// and `force_reload` is false.
    pub fn load_csv(
        &mut self,
        ingestor: &CsvIngestor,
        paths: &[PathBuf],
        force_reload: bool,
    ) -> Result<()> {
        if self.store.is_loaded() && !force_reload {
            debug!(
                "[{}] data has been already loaded, use force_reload to reload",
                self.label()
            );
            return Ok(());
        }
        let series = ingestor.read(paths)?;
        self.reset(series)
    }

    /// Per-column summary statistics of the held series.
    pub fn describe(&self) -> Result<DataSummary> {
        let summary = describe(self.store.series()?)?;
        info!("[{}] data summary:\n{summary}", self.label());
        Ok(summary)
    }

    /// Columnar feed of the held series.
    pub fn to_feed(&self, columns: &FeedColumns) -> Result<Feed> {
        to_feed(self.store.series()?, columns, self.sampling.timeframe_minutes)
    }

    /// Draw a train or test episode, or return the cached one.
    ///
    /// Test episodes are always drawn uniformly; the request's Beta parameters
    /// only shape train draws. With `get_new == false` and a cached episode the
    /// same `Arc` is returned and nothing changes.
    pub fn sample(&mut self, request: &SampleRequest) -> Result<Arc<Episode>> {
        if !self.is_ready() {
            error!(
                "[{}] sampling attempt: data not ready, forgot to call reset()?",
                self.label()
            );
            return Err(SamplingError::NotReady);
        }
        let kind = SampleKind::try_from(request.sample_type)?;

        if !request.get_new {
            if let Some(cached) = &self.cached {
                debug!("[{}] reusing sample, id: {}", self.label(), cached.id());
                return Ok(Arc::clone(cached));
            }
        }

        let (train, test) = match &self.plan {
            Some(plan) => (plan.train, plan.test),
            None => return Err(SamplingError::NotReady),
        };
        let mut episode = if kind == SampleKind::Test {
            let name = format!("test_{}", self.sample_name());
            self.sample_interval(test, 1.0, 1.0, &name)?
        } else {
            let name = format!("train_{}", self.sample_name());
            self.sample_interval(train, request.beta_alpha, request.beta_beta, &name)?
        };

        let meta = episode.metadata_mut();
        meta.kind = Some(kind);
        meta.sample_index = self.sample_index;
        meta.parent_sample_index = Some(self.metadata.sample_index);
        meta.parent_kind = self.metadata.kind;
        self.sample_index += 1;

        let episode = Arc::new(episode);
        self.cached = Some(Arc::clone(&episode));
        Ok(episode)
    }

    /// Draw one episode whose rows lie entirely within `interval`, with the
    /// start offset scaled from a Beta(`alpha`, `beta`) draw.
    pub fn sample_interval(
        &mut self,
        interval: RowInterval,
        alpha: f64,
        beta: f64,
        name: &str,
    ) -> Result<Episode> {
        let row_count = self.store.series()?.len();
        let plan = self.plan.as_ref().ok_or(SamplingError::NotReady)?;
        let episode_rows = plan.episode_row_count;

        if !(interval.low < interval.high
            && interval.high <= row_count
            && interval.len() >= episode_rows)
        {
            error!(
                "[{}] cannot sample with size {episode_rows}, inside {interval} from dataset of {row_count} records",
                self.label()
            );
            return Err(SamplingError::InvalidInterval {
                interval,
                episode_rows,
                row_count,
            });
        }
        let distribution = beta_distribution(alpha, beta)?;
        let span = interval.len() - episode_rows;

        let label = self.label();
        let search = WindowSearch {
            store: &self.store,
            config: &self.sampling,
            plan,
            label,
        };
        let window = search.run(&mut self.rng, interval, |rng| {
            interval.low + scaled_offset(span, distribution.sample(rng))
        })?;

        self.build_episode(name, window, SampleKind::Interval)
    }

    /// Draw one episode from anywhere in the series with a uniform proposal,
    /// ignoring the train/test split.
    pub fn sample_random(&mut self, name: &str) -> Result<Episode> {
        let row_count = self.store.series()?.len();
        let plan = self.plan.as_ref().ok_or(SamplingError::NotReady)?;
        let span = row_count - plan.episode_row_count;
        let bounds = RowInterval::new(0, row_count);

        let label = self.label();
        let search = WindowSearch {
            store: &self.store,
            config: &self.sampling,
            plan,
            label,
        };
        let window = search.run(&mut self.rng, bounds, |rng| {
            if span == 0 {
                0
            } else {
                rng.gen_range(0..span)
            }
        })?;

        self.build_episode(name, window, SampleKind::Random)
    }

    /// Build a sampler over `episode`'s rows through `factory`.
    pub fn nested<F: SampleFactory + ?Sized>(
        &self,
        episode: &Episode,
        factory: &F,
    ) -> Result<EpisodeSampler> {
        let params = NestedParams {
            name: self.sampling.episode_name.clone(),
            task: self.task,
            depth: self.depth + 1,
            series: episode.series().clone(),
            metadata: episode.metadata().clone(),
            seeds: self
                .seeds
                .as_ref()
                .map(|s| s.child(episode.id(), self.task, self.depth as u64)),
        };
        factory.build(params)
    }

    fn build_episode(&self, name: &str, window: Window, kind: SampleKind) -> Result<Episode> {
        let episode_rows = self
            .plan
            .as_ref()
            .map_or(0, |plan| plan.episode_row_count);
        let rows = self
            .store
            .rows_in_range(window.first_row, window.first_row + episode_rows)?;
        let metadata = EpisodeMetadata {
            kind: Some(kind),
            sample_index: self.sample_index,
            first_row: window.first_row,
            parent_sample_index: None,
            parent_kind: None,
        };
        let episode = Episode::new(name, window.anchor, rows, metadata, self.depth);
        info!(
            "[{}] new sample id: <{}>, duration {}",
            self.label(),
            episode.id(),
            window.realized
        );
        Ok(episode)
    }
}

fn beta_distribution(alpha: f64, beta: f64) -> Result<Beta<f64>> {
    let invalid = SamplingError::InvalidDistributionParam { alpha, beta };
    if !(alpha.is_finite() && beta.is_finite() && alpha > 0.0 && beta > 0.0) {
        return Err(invalid);
    }
    Beta::new(alpha, beta).map_err(|_| invalid)
}

/// `floor(span * fraction)`, clamped to `span`.
fn scaled_offset(span: usize, fraction: f64) -> usize {
    ((span as f64 * fraction).floor() as usize).min(span)
}

/// An accepted window, before materialization.
struct Window {
    first_row: usize,
    anchor: Anchor,
    realized: Duration,
}

struct WindowSearch<'a> {
    store: &'a SeriesStore,
    config: &'a SamplingConfig,
    plan: &'a PartitionPlan,
    label: String,
}

impl WindowSearch<'_> {
    fn run<R, P>(&self, rng: &mut R, bounds: RowInterval, mut propose: P) -> Result<Window>
    where
        R: Rng,
        P: FnMut(&mut R) -> usize,
    {
        let max_attempts = self.config.max_attempts;
        debug!(
            "[{}] episode duration {}, {} rows, time gap {}",
            self.label,
            self.plan.episode_duration,
            self.plan.episode_row_count,
            self.plan.gap_tolerance
        );

        let mut attempts = 0;
        while attempts < max_attempts {
            let mut candidate = propose(rng);
            attempts += 1;

            while !self.start_allowed(candidate)? {
                if attempts >= max_attempts {
                    return Err(self.exhausted(attempts));
                }
                debug!("[{}] not a good day to start, resampling", self.label);
                candidate = propose(rng);
                attempts += 1;
            }

            let anchor = self.anchor_for(candidate)?;
            let first_row = self.store.nearest_row_for_timestamp(anchor.timestamp())?;

            if let Some(realized) = self.accept_window(first_row, bounds)? {
                debug!("[{}] attempt {attempts}: sample accepted", self.label);
                return Ok(Window {
                    first_row,
                    anchor,
                    realized,
                });
            }
            debug!(
                "[{}] attempt {attempts}: window at row {first_row} rejected, resampling",
                self.label
            );
        }
        Err(self.exhausted(attempts))
    }

    fn start_allowed(&self, row: usize) -> Result<bool> {
        let record = self.store.record_at(row)?;
        debug!(
            "[{}] sample start: {}, weekday: {}",
            self.label,
            record.timestamp,
            record.weekday()
        );
        Ok(self.config.allows_weekday(record.weekday()))
    }

    fn anchor_for(&self, row: usize) -> Result<Anchor> {
        let ts = self.store.timestamp_at(row)?;
        Ok(if self.config.start_at_midnight {
            Anchor::Midnight(ts.date())
        } else {
            Anchor::Exact(ts)
        })
    }

    /// Realized duration of the window starting at `first_row` when it passes
    /// containment, weekday and gap checks.
    fn accept_window(&self, first_row: usize, bounds: RowInterval) -> Result<Option<Duration>> {
        let rows = self.plan.episode_row_count;
        if rows == 0 || first_row < bounds.low || first_row + rows > bounds.high {
            return Ok(None);
        }
        let first = self.store.record_at(first_row)?;
        if !self.config.allows_weekday(first.weekday()) {
            return Ok(None);
        }
        let last = self.store.record_at(first_row + rows - 1)?;
        let realized = last.timestamp - first.timestamp;
        let excess = realized - self.plan.episode_duration;
        debug!(
            "[{}] actual sample duration: {realized}, total time gap: {excess}",
            self.label
        );
        Ok((excess < self.plan.gap_tolerance).then_some(realized))
    }

    fn exhausted(&self, attempts: usize) -> SamplingError {
        let err = SamplingError::SamplingExhausted { attempts };
        error!("[{}] {err}", self.label);
        err
    }
}
