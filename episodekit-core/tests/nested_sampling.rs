//! Samplers built from episodes: lineage, depth limits, reproducibility.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use episodekit_core::{
    DatasetConfig, EpisodeSampler, NestedParams, NestingConfig, PeriodSpec, Record, SampleFactory,
    SampleKind, SampleRequest, SamplerFactory, SamplingConfig, SamplingError, Series,
};

fn monday() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn minute_series(n: usize) -> Series {
    let records = (0..n)
        .map(|i| Record {
            timestamp: monday() + Duration::minutes(i as i64),
            open: 1.0,
            high: 1.1,
            low: 0.9,
            close: 1.05,
            volume: 1.0,
        })
        .collect();
    Series::new(records).unwrap()
}

fn config() -> DatasetConfig {
    let outer = SamplingConfig {
        start_weekdays: (0..=6).collect(),
        start_at_midnight: false,
        sample_duration: PeriodSpec::hours(4),
        time_gap: PeriodSpec::minutes(1),
        test_period: PeriodSpec::hours(4),
        ..SamplingConfig::default()
    };
    let inner = SamplingConfig {
        sample_duration: PeriodSpec::minutes(30),
        test_period: PeriodSpec::hours(1),
        ..outer.clone()
    };
    DatasetConfig {
        seed: Some(77),
        sampling: outer,
        nesting: NestingConfig {
            max_depth: 2,
            sampling: Some(inner),
        },
        ..DatasetConfig::default()
    }
}

fn root(config: &DatasetConfig) -> EpisodeSampler {
    let mut sampler = EpisodeSampler::from_config(config).unwrap();
    sampler.reset(minute_series(4_000)).unwrap();
    sampler
}

#[test]
fn test_episode_lineage_reaches_nested_samples() {
    let config = config();
    let factory = SamplerFactory::from_config(&config);
    let mut outer = root(&config);

    outer.sample(&SampleRequest::train()).unwrap();
    let episode = outer.sample(&SampleRequest::test()).unwrap();
    assert_eq!(episode.metadata().sample_index, 1);

    let mut inner = outer.nested(&episode, &factory).unwrap();
    assert_eq!(inner.store().row_count(), 240);
    assert_eq!(inner.plan().unwrap().test.len(), 60);
    assert_eq!(inner.metadata().kind, Some(SampleKind::Test));

    let train = inner.sample(&SampleRequest::train()).unwrap();
    let test = inner.sample(&SampleRequest::test()).unwrap();
    for nested in [&train, &test] {
        assert_eq!(nested.len(), 30);
        assert_eq!(nested.depth(), 1);
        assert_eq!(nested.metadata().parent_sample_index, Some(1));
        assert_eq!(nested.metadata().parent_kind, Some(SampleKind::Test));
    }
    assert!(train.metadata().first_row + 30 <= 180);
    assert!((180..=210).contains(&test.metadata().first_row));
    assert!(train.id().starts_with("train_data_stream_w_0_n0_at_"));
}

#[test]
fn nesting_stops_at_max_depth() {
    let config = config();
    let factory = SamplerFactory::new(
        SamplingConfig {
            sample_duration: PeriodSpec::minutes(10),
            test_period: PeriodSpec::default(),
            ..config.sampling.clone()
        },
        2,
    );
    let mut level0 = root(&config);
    let e0 = level0.sample(&SampleRequest::train()).unwrap();
    let mut level1 = level0.nested(&e0, &factory).unwrap();
    let e1 = level1.sample(&SampleRequest::train()).unwrap();
    let mut level2 = level1.nested(&e1, &factory).unwrap();
    assert_eq!(level2.depth(), 2);
    let e2 = level2.sample(&SampleRequest::train()).unwrap();

    assert!(matches!(
        level2.nested(&e2, &factory),
        Err(SamplingError::NestingTooDeep {
            depth: 3,
            max_depth: 2
        })
    ));
}

#[test]
fn nested_streams_are_reproducible() {
    let config = config();
    let factory = SamplerFactory::from_config(&config);
    let draw = || {
        let mut outer = root(&config);
        let episode = outer.sample(&SampleRequest::train()).unwrap();
        let mut inner = outer.nested(&episode, &factory).unwrap();
        (0..5)
            .map(|_| inner.sample(&SampleRequest::train()).unwrap().id().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(), draw());
}

/// A caller-supplied factory sees the parameters the sampler derives.
struct Recording;

impl SampleFactory for Recording {
    fn build(&self, params: NestedParams) -> episodekit_core::Result<EpisodeSampler> {
        assert_eq!(params.name, "data_stream");
        assert_eq!(params.depth, 1);
        assert!(params.seeds.is_some());
        SamplerFactory::new(
            SamplingConfig {
                sample_duration: PeriodSpec::minutes(5),
                test_period: PeriodSpec::default(),
                start_weekdays: (0..=6).collect(),
                start_at_midnight: false,
                ..SamplingConfig::default()
            },
            1,
        )
        .build(params)
    }
}

#[test]
fn custom_factory_receives_nested_params() {
    let config = config();
    let mut outer = root(&config);
    let episode = outer.sample(&SampleRequest::train()).unwrap();
    let inner = outer.nested(&episode, &Recording).unwrap();
    assert_eq!(inner.plan().unwrap().episode_row_count, 5);
}
