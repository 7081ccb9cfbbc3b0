// crates/ndvi/src/main.rs

mod io;
mod local;
mod summary;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ndvi_core::provider::{fetch_completed, NdviProvider};
use ndvi_core::{reconcile, InsufficientDataPolicy, ReconcileConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::local::LocalFileProvider;
use crate::summary::{render_table, RunSummary};

const CONFIG_ENV: &str = "NDVI_CONFIG";

#[derive(Parser, Debug)]
#[command(author, version, about = "Reconcile two-source NDVI observations into smoothed daily series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile a raw observation table and write the daily series
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Raw observation table (.parquet or .csv)
    #[arg(long)]
    input: PathBuf,
    /// Destination of the reconciled table (.parquet or .csv)
    #[arg(long)]
    output: PathBuf,
    #[command(flatten)]
    overrides: ConfigArgs,
    /// Write the per-unit run summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// TOML configuration file (falls back to $NDVI_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Absolute deviation threshold for outlier removal
    #[arg(long)]
    threshold: Option<f64>,
    /// Savitzky-Golay window length in days
    #[arg(long)]
    window_length: Option<usize>,
    /// Savitzky-Golay polynomial order
    #[arg(long)]
    polyorder: Option<usize>,
    /// Worker threads for per-unit processing
    #[arg(long)]
    concurrency: Option<usize>,
    /// Abort instead of skipping units shorter than the smoothing window
    #[arg(long)]
    fail_on_insufficient: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Config(args) => {
            let config = load_config(&args)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.overrides)?;

    let provider = LocalFileProvider::new();
    let job = provider
        .submit(&args.input)
        .with_context(|| format!("failed to submit {}", args.input.display()))?;
    let raw = fetch_completed(&provider, &job)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!(job = %job, rows = raw.height(), "loaded raw observations");

    let mut output = reconcile(&raw, &config).context("reconciliation failed")?;
    if !output.skipped_units.is_empty() {
        warn!(
            skipped = output.skipped_units.len(),
            "some units were not reconciled"
        );
    }

    io::write_table(&mut output.dataframe, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        rows = output.dataframe.height(),
        "wrote reconciled table"
    );

    if let Some(path) = &args.summary {
        write_summary(&output, path)?;
    }
    println!("{}", render_table(&output));
    Ok(())
}

fn load_config(args: &ConfigArgs) -> Result<ReconcileConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let mut config = match &path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            ReconcileConfig::from_toml_str(&contents)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => ReconcileConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.outlier.threshold = threshold;
    }
    if let Some(window_length) = args.window_length {
        config.smoothing.window_length = window_length;
    }
    if let Some(polyorder) = args.polyorder {
        config.smoothing.polyorder = polyorder;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if args.fail_on_insufficient {
        config.insufficient_data = InsufficientDataPolicy::Fail;
    }

    config
        .validate()
        .context("configuration rejected after applying command-line overrides")?;
    Ok(config)
}

fn write_summary(output: &ndvi_core::ReconcileOutput, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunSummary::new(output))
        .context("failed to serialise run summary")?;
    fs::write(path, json).with_context(|| format!("failed to write summary {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn overrides_apply_on_top_of_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ndvi.toml");
        fs::write(
            &path,
            "unit_key = \"location\"\n\n[smoothing]\nwindow_length = 9\n",
        )
        .expect("write config");

        let args = ConfigArgs {
            config: Some(path),
            threshold: Some(0.2),
            fail_on_insufficient: true,
            ..ConfigArgs::default()
        };
        let config = load_config(&args).expect("config");
        assert_eq!(config.unit_key, "location");
        assert_eq!(config.smoothing.window_length, 9);
        assert_eq!(config.outlier.threshold, 0.2);
        assert_eq!(config.insufficient_data, InsufficientDataPolicy::Fail);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = ConfigArgs {
            window_length: Some(2),
            polyorder: Some(2),
            ..ConfigArgs::default()
        };
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn run_writes_table_and_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("daily.parquet");
        let summary = dir.path().join("summary.json");

        let mut raw = df![
            "point" => [3i64, 3, 3, 8, 8],
            "time" => ["2024-03-01", "2024-03-03", "2024-03-07", "2024-03-01", "2024-03-02"],
            "ndvi.sentinel2" => [0.31, 0.35, 0.43, 0.5, 0.52],
            "qa.sentinel2" => [1i64, 1, 1, 1, 1],
            "ndvi.landsat" => [0.0, 0.0, 0.0, 0.0, 0.0],
            "qa.landsat" => [0i64, 0, 0, 0, 0],
        ]
        .expect("raw");
        io::write_table(&mut raw, &input).expect("write input");

        run(RunArgs {
            input,
            output: output.clone(),
            overrides: ConfigArgs {
                window_length: Some(5),
                ..ConfigArgs::default()
            },
            summary: Some(summary.clone()),
        })
        .expect("run");

        let daily = io::read_table(&output).expect("read output");
        assert_eq!(daily.height(), 7);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary).expect("summary")).expect("json");
        assert_eq!(json["output_rows"], 7);
        assert_eq!(json["skipped_units"][0]["unit"], 8);
        assert_eq!(json["skipped_units"][0]["reason"], "insufficient_data");
    }
}
