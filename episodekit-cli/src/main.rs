//! EpisodeKit CLI: plan, describe and sample commands.
//!
//! Commands:
//! - `plan`: load CSV data and print the train/test partition
//! - `describe`: print per-column summary statistics
//! - `sample`: draw episodes and print their summaries as JSON lines

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};

use episodekit_core::{
    to_feed, CsvIngestor, DatasetConfig, EpisodeSampler, SampleKind, SampleRequest,
};

#[derive(Parser)]
#[command(
    name = "episodekit",
    about = "EpisodeKit CLI: train/test episode sampling over time series"
)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DataArgs {
    /// CSV files, concatenated in the given order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to a TOML dataset config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured master seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load data and print the train/test partition as JSON.
    Plan {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Print summary statistics of the loaded data.
    Describe {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Draw episodes and print one JSON summary per line.
    Sample {
        #[command(flatten)]
        data: DataArgs,

        /// Number of episodes to draw.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Which part of the data to sample from.
        #[arg(long, value_enum, default_value_t = Kind::Train)]
        kind: Kind,

        /// Beta alpha for train sampling (1.0 = uniform).
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,

        /// Beta beta for train sampling (1.0 = uniform).
        #[arg(long, default_value_t = 1.0)]
        beta: f64,

        /// Write the last episode as a Parquet feed to this path.
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Train,
    Test,
    Random,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    match cli.command {
        Commands::Plan { data } => run_plan(&data),
        Commands::Describe { data } => run_describe(&data),
        Commands::Sample {
            data,
            count,
            kind,
            alpha,
            beta,
            export,
        } => run_sample(&data, count, kind, alpha, beta, export.as_deref()),
    }
}

fn load_config(data: &DataArgs) -> Result<DatasetConfig> {
    let mut config = match &data.config {
        Some(path) => DatasetConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DatasetConfig::default(),
    };
    if data.seed.is_some() {
        config.seed = data.seed;
    }
    Ok(config)
}

fn load_sampler(data: &DataArgs) -> Result<(DatasetConfig, EpisodeSampler)> {
    let config = load_config(data)?;
    let mut sampler = EpisodeSampler::from_config(&config)?;
    let ingestor = CsvIngestor::new(config.parsing.clone());
    sampler
        .load_csv(&ingestor, &data.files, false)
        .context("loading data")?;
    Ok((config, sampler))
}

fn run_plan(data: &DataArgs) -> Result<()> {
    let (_, sampler) = load_sampler(data)?;
    let Some(plan) = sampler.plan() else {
        bail!("sampler has no partition plan");
    };
    let span = sampler.store().time_span()?;
    let out = serde_json::json!({
        "rows": plan.row_count,
        "episode_rows": plan.episode_row_count,
        "train": [plan.train.low, plan.train.high],
        "test": [plan.test.low, plan.test.high],
        "episode_duration_secs": plan.episode_duration.num_seconds(),
        "gap_tolerance_secs": plan.gap_tolerance.num_seconds(),
        "time_span_secs": span.num_seconds(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_describe(data: &DataArgs) -> Result<()> {
    let (_, sampler) = load_sampler(data)?;
    print!("{}", sampler.describe()?);
    Ok(())
}

fn run_sample(
    data: &DataArgs,
    count: usize,
    kind: Kind,
    alpha: f64,
    beta: f64,
    export: Option<&Path>,
) -> Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    let (config, mut sampler) = load_sampler(data)?;
    let request = match kind {
        Kind::Train => SampleRequest::train().with_beta(alpha, beta),
        Kind::Test => SampleRequest::test(),
        Kind::Random => SampleRequest::default(),
    };

    let mut last = None;
    for _ in 0..count {
        let episode = if kind == Kind::Random {
            let name = format!("{}_", SampleKind::Random);
            std::sync::Arc::new(sampler.sample_random(&name)?)
        } else {
            sampler.sample(&request)?
        };
        println!("{}", serde_json::to_string(&episode.summary())?);
        last = Some(episode);
    }

    if let (Some(path), Some(episode)) = (export, last) {
        let feed = to_feed(
            episode.series(),
            &config.parsing.feed,
            config.sampling.timeframe_minutes,
        )?;
        feed.write_parquet(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {} rows to {}", feed.num_records, path.display());
    }
    Ok(())
}
