//! Nested sampling: building samplers over an episode's rows.
//!
//! The caller owns the produced sampler; nothing links it back to its parent
//! except the lineage copied into its metadata.

use log::debug;

use crate::config::{DatasetConfig, SamplingConfig};
use crate::episode::EpisodeMetadata;
use crate::error::{Result, SamplingError};
use crate::rng::SeedHierarchy;
use crate::sampler::EpisodeSampler;
use crate::series::Series;

/// Everything a factory receives to build one nested sampler.
#[derive(Debug, Clone)]
pub struct NestedParams {
    /// Name of the nested sampler, also its log prefix.
    pub name: String,
    pub task: usize,
    /// Level of the sampler to build; the root sampler is level 0.
    pub depth: usize,
    /// Rows of the parent episode.
    pub series: Series,
    /// Parent episode's metadata, inherited as the nested sampler's own.
    pub metadata: EpisodeMetadata,
    pub seeds: Option<SeedHierarchy>,
}

/// Constructs samplers over episode rows.
pub trait SampleFactory {
    fn build(&self, params: NestedParams) -> Result<EpisodeSampler>;
}

/// Default factory: one sampling configuration and a depth limit.
#[derive(Debug, Clone)]
pub struct SamplerFactory {
    sampling: SamplingConfig,
    max_depth: usize,
}

impl SamplerFactory {
    pub fn new(sampling: SamplingConfig, max_depth: usize) -> Self {
        Self {
            sampling,
            max_depth,
        }
    }

    /// Nested sampling settings from `config.nesting`, falling back to the
    /// dataset's own sampling settings.
    pub fn from_config(config: &DatasetConfig) -> Self {
        let sampling = config
            .nesting
            .sampling
            .clone()
            .unwrap_or_else(|| config.sampling.clone());
        Self::new(sampling, config.nesting.max_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl SampleFactory for SamplerFactory {
    fn build(&self, params: NestedParams) -> Result<EpisodeSampler> {
        if params.depth > self.max_depth {
            return Err(SamplingError::NestingTooDeep {
                depth: params.depth,
                max_depth: self.max_depth,
            });
        }
        debug!(
            "building nested sampler '{}' at depth {} over {} rows",
            params.name,
            params.depth,
            params.series.len()
        );
        let mut sampler = EpisodeSampler::with_lineage(
            params.name,
            params.task,
            params.depth,
            self.sampling.clone(),
            params.seeds,
            params.metadata,
        )?;
        sampler.reset(params.series)?;
        Ok(sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PeriodSpec, SampleRequest};
    use crate::episode::SampleKind;
    use crate::series::test_support::{minute_series, monday};

    fn sampling(duration: PeriodSpec) -> SamplingConfig {
        SamplingConfig {
            start_weekdays: (0..=6).collect(),
            start_at_midnight: false,
            sample_duration: duration,
            time_gap: PeriodSpec::default(),
            test_period: PeriodSpec::default(),
            ..SamplingConfig::default()
        }
    }

    fn root() -> EpisodeSampler {
        let mut sampler =
            EpisodeSampler::new("base_data", 0, sampling(PeriodSpec::hours(2)), Some(9)).unwrap();
        sampler.reset(minute_series(monday(), 2_000)).unwrap();
        sampler
    }

    #[test]
    fn nested_sampler_inherits_episode_lineage() {
        let mut parent = root();
        parent.sample(&SampleRequest::train()).unwrap();
        let episode = parent.sample(&SampleRequest::train()).unwrap();

        let factory = SamplerFactory::new(sampling(PeriodSpec::minutes(20)), 1);
        let mut child = parent.nested(&episode, &factory).unwrap();
        assert_eq!(child.depth(), 1);
        assert_eq!(child.name(), "data_stream");
        assert_eq!(child.store().row_count(), 120);
        assert_eq!(child.metadata().sample_index, 1);

        let inner = child.sample(&SampleRequest::train()).unwrap();
        assert_eq!(inner.len(), 20);
        assert_eq!(inner.depth(), 1);
        assert_eq!(inner.metadata().parent_sample_index, Some(1));
        assert_eq!(inner.metadata().parent_kind, Some(SampleKind::Train));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut parent = root();
        let episode = parent.sample(&SampleRequest::train()).unwrap();

        let factory = SamplerFactory::new(sampling(PeriodSpec::minutes(20)), 1);
        let mut child = parent.nested(&episode, &factory).unwrap();
        let inner = child.sample(&SampleRequest::train()).unwrap();
        let err = child.nested(&inner, &factory).unwrap_err();
        assert!(matches!(
            err,
            SamplingError::NestingTooDeep {
                depth: 2,
                max_depth: 1
            }
        ));
    }

    #[test]
    fn nested_episode_too_short_fails_planning() {
        let mut parent = root();
        let episode = parent.sample(&SampleRequest::train()).unwrap();
        let factory = SamplerFactory::new(sampling(PeriodSpec::hours(3)), 1);
        assert!(matches!(
            parent.nested(&episode, &factory),
            Err(SamplingError::InsufficientData { .. })
        ));
    }

    #[test]
    fn from_config_falls_back_to_dataset_sampling() {
        let config = DatasetConfig::default();
        let factory = SamplerFactory::from_config(&config);
        assert_eq!(factory.max_depth(), 1);
        assert_eq!(factory.sampling, config.sampling);
    }
}
