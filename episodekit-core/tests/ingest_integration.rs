//! CSV ingestion into a sampler: multi-file concatenation, dedup, reload.

use std::fs;
use std::path::PathBuf;

use episodekit_core::{
    CsvIngestor, EpisodeSampler, FeedColumns, IngestError, ParsingConfig, PeriodSpec,
    SampleRequest, SamplingConfig, SamplingError,
};

/// `n` HistData-style minute bars starting at `hour`:`minute` on 2017-01-02.
fn histdata_lines(hour: u32, minute: u32, n: u32) -> String {
    (0..n)
        .map(|i| {
            let total = hour * 60 + minute + i;
            format!(
                "20170102 {:02}{:02}00;1.05{:02};1.06;1.04;1.05;{}\n",
                total / 60,
                total % 60,
                i % 100,
                i
            )
        })
        .collect()
}

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn sampling() -> SamplingConfig {
    SamplingConfig {
        start_weekdays: (0..=6).collect(),
        start_at_midnight: false,
        sample_duration: PeriodSpec::minutes(30),
        time_gap: PeriodSpec::minutes(1),
        ..SamplingConfig::default()
    }
}

#[test]
fn overlapping_files_keep_first_occurrence() {
    let dir = tempfile::tempdir().unwrap();
    // 10:00..11:39 and 11:00..12:39 overlap for an hour.
    let a = write(&dir, "a.csv", &histdata_lines(10, 0, 100));
    let b = write(&dir, "b.csv", &histdata_lines(11, 0, 100));

    let series = CsvIngestor::new(ParsingConfig::default())
        .read(&[a, b])
        .unwrap();
    assert_eq!(series.len(), 160);
    // 11:00 comes from the first file, where it is row 60.
    assert_eq!(series.records()[60].volume, 60.0);
    assert_eq!(series.records()[100].volume, 40.0);
}

#[test]
fn out_of_order_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let late = write(&dir, "late.csv", &histdata_lines(12, 0, 10));
    let early = write(&dir, "early.csv", &histdata_lines(10, 0, 10));

    let err = CsvIngestor::new(ParsingConfig::default())
        .read(&[late, early])
        .unwrap_err();
    assert!(matches!(
        err,
        SamplingError::Ingest(IngestError::Unordered { line: 1, .. })
    ));
}

#[test]
fn load_csv_respects_force_reload() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(&dir, "first.csv", &histdata_lines(0, 0, 200));
    let second = write(&dir, "second.csv", &histdata_lines(0, 0, 300));
    let ingestor = CsvIngestor::new(ParsingConfig::default());

    let mut sampler = EpisodeSampler::new("eurusd", 0, sampling(), Some(5)).unwrap();
    sampler.load_csv(&ingestor, &[first], false).unwrap();
    assert_eq!(sampler.store().row_count(), 200);
    sampler.sample(&SampleRequest::train()).unwrap();

    sampler
        .load_csv(&ingestor, std::slice::from_ref(&second), false)
        .unwrap();
    assert_eq!(sampler.store().row_count(), 200);
    assert_eq!(sampler.sample_count(), 1);

    sampler.load_csv(&ingestor, &[second], true).unwrap();
    assert_eq!(sampler.store().row_count(), 300);
    assert_eq!(sampler.sample_count(), 0);
    assert!(sampler.cached_episode().is_none());
}

#[test]
fn missing_file_leaves_sampler_unloaded() {
    let ingestor = CsvIngestor::new(ParsingConfig::default());
    let mut sampler = EpisodeSampler::new("eurusd", 0, sampling(), None).unwrap();
    let err = sampler
        .load_csv(&ingestor, &[PathBuf::from("no/such/file.csv")], false)
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(!sampler.is_ready());
}

#[test]
fn loaded_data_describes_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "bars.csv", &histdata_lines(9, 0, 120));
    let ingestor = CsvIngestor::new(ParsingConfig::default());

    let mut sampler = EpisodeSampler::new("eurusd", 0, sampling(), Some(1)).unwrap();
    sampler.load_csv(&ingestor, &[path], false).unwrap();

    let summary = sampler.describe().unwrap();
    assert_eq!(summary.rows, 120);
    assert_eq!(summary.column("high").unwrap().max, 1.06);

    let feed = sampler
        .to_feed(&FeedColumns {
            volume: Some(5),
            ..FeedColumns::default()
        })
        .unwrap();
    assert_eq!(feed.num_records, 120);
    assert_eq!(feed.frame.width(), 6);

    let out = dir.path().join("bars.parquet");
    feed.write_parquet(&out).unwrap();
    assert!(out.metadata().unwrap().len() > 0);
}
