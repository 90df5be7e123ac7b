//! tempcast CLI for training, evaluating and serving the temperature forecaster.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use chrono::{DateTime, Duration, Local};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tempcast::prelude::*;

#[derive(Parser)]
#[command(name = "tempcast")]
#[command(author, version)]
#[command(about = "Forecast the next 72 hours of temperature with a transformer encoder")]
#[command(long_about = "tempcast: train, evaluate and run a 72-hour temperature forecaster.

The input CSV needs the columns temperature, relative_humidity,
wind_speed_10m (km/h) and pressure_msl (hPa), one row per hour in
chronological order. Other columns are ignored.

EXAMPLES:
  # Train with defaults and write checkpoints/final_transformer_model.{mpk,json}
  tempcast train --data weather.csv

  # Train from a config file, overriding the epoch count
  tempcast train --data weather.csv --config experiment.json --epochs 5

  # Score the checkpoint on the test split
  tempcast evaluate --data weather.csv

  # Forecast from the last 96 rows
  tempcast predict --data recent.csv --json

  # Print the default configuration
  tempcast config")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and write a checkpoint
    Train(TrainArgs),
    /// Evaluate a checkpoint on the test split
    Evaluate {
        /// Weather CSV
        #[arg(long, value_name = "CSV")]
        data: PathBuf,

        #[command(flatten)]
        checkpoint: CheckpointArgs,
    },
    /// Forecast from the most recent rows of a CSV
    Predict {
        /// Weather CSV; the last input-window rows are used
        #[arg(long, value_name = "CSV")]
        data: PathBuf,

        #[command(flatten)]
        checkpoint: CheckpointArgs,

        /// Print a JSON payload instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print or write the default experiment configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckpointArgs {
    /// Checkpoint directory
    #[arg(long, default_value = DEFAULT_CHECKPOINT_DIR, value_name = "DIR")]
    checkpoint_dir: PathBuf,

    /// Checkpoint file stem
    #[arg(long, default_value = DEFAULT_CHECKPOINT_NAME, value_name = "NAME")]
    name: String,
}

#[derive(Args)]
struct TrainArgs {
    /// Weather CSV
    #[arg(long, value_name = "CSV")]
    data: PathBuf,

    /// Experiment config JSON; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of training epochs
    #[arg(long, value_name = "N")]
    epochs: Option<usize>,

    /// Learning rate for Adam
    #[arg(long, value_name = "LR")]
    lr: Option<f64>,

    /// Batch size
    #[arg(long, value_name = "SIZE")]
    batch_size: Option<usize>,

    /// Hours of history per example
    #[arg(long, value_name = "HOURS")]
    input_window: Option<usize>,

    /// Random seed
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Checkpoint directory
    #[arg(long, value_name = "DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Checkpoint file stem
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Also report MAE/RMSE on the test split after training
    #[arg(long)]
    evaluate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Train(args) => handle_train(args),
        Commands::Evaluate { data, checkpoint } => handle_evaluate(&data, &checkpoint),
        Commands::Predict {
            data,
            checkpoint,
            json,
        } => handle_predict(&data, &checkpoint, json),
        Commands::Config { output } => handle_config(output),
    }
}

/// Merge the config file (or defaults) with command-line overrides.
fn resolve_config(args: &TrainArgs) -> Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    if let Some(epochs) = args.epochs {
        config.trainer.epochs = epochs;
    }
    if let Some(lr) = args.lr {
        config.trainer.learning_rate = lr;
    }
    if let Some(batch_size) = args.batch_size {
        config.trainer.batch_size = batch_size;
    }
    if let Some(input_window) = args.input_window {
        config.window.input_window = input_window;
    }
    if let Some(seed) = args.seed {
        config.trainer.seed = seed;
    }
    if let Some(name) = &args.name {
        config.trainer.checkpoint_name = name.clone();
    }
    config.trainer.checkpoint_dir = Some(
        args.checkpoint_dir
            .clone()
            .or_else(|| config.trainer.checkpoint_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT_DIR)),
    );

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn handle_train(args: TrainArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    println!("=== tempcast Training ===\n");
    println!("Configuration:");
    println!("  Data: {}", args.data.display());
    println!(
        "  Windows: {}h in -> {}h out (split {:.0}% train)",
        config.window.input_window,
        config.window.output_window,
        config.window.split_ratio * 100.0
    );
    println!(
        "  Model: d_model={} nhead={} layers={} dropout={}",
        config.model.d_model, config.model.nhead, config.model.num_layers, config.model.dropout
    );
    println!("  Epochs: {}", config.trainer.epochs);
    println!("  Learning rate: {}", config.trainer.learning_rate);
    println!("  Batch size: {}", config.trainer.batch_size);
    println!("  Seed: {}\n", config.trainer.seed);

    let series = WeatherSeries::from_csv(&args.data)
        .with_context(|| format!("Failed to load {}", args.data.display()))?;
    println!("Loaded {} rows", series.len());

    let (train, test) = WindowedSeriesDataset::train_test(&series, config.window)
        .context("Failed to build datasets")?;
    println!("  Train windows: {}", train.len());
    println!("  Test windows: {}\n", test.len());

    let trainer = ForecastTrainer::<TrainingBackend>::new(config.trainer.clone(), Default::default());
    let output = trainer
        .fit(&config.model, &train)
        .context("Training failed")?;

    for (epoch, loss) in output.epoch_losses.iter().enumerate() {
        println!("Epoch {:3}/{}: loss={:.4}", epoch + 1, output.epoch_losses.len(), loss);
    }
    println!("\nTraining complete in {:.1}s", output.training_time_secs);
    if let Some(paths) = &output.checkpoint {
        println!("Checkpoint: {}", paths.weights().display());
        println!("Metadata:   {}", paths.metadata().display());
    }

    if args.evaluate {
        let report = evaluate(&output.model.valid(), &test, &Default::default())
            .context("Evaluation failed")?;
        print_report(&report);
    }

    Ok(())
}

fn handle_evaluate(data: &Path, checkpoint: &CheckpointArgs) -> Result<()> {
    let device = Default::default();
    let (model, metadata) =
        load_checkpoint::<InferenceBackend>(&checkpoint.checkpoint_dir, &checkpoint.name, None, &device)
            .with_context(|| {
                format!(
                    "Failed to load checkpoint '{}' from {}",
                    checkpoint.name,
                    checkpoint.checkpoint_dir.display()
                )
            })?;

    let series = WeatherSeries::from_csv(data)
        .with_context(|| format!("Failed to load {}", data.display()))?;
    let test = WindowedSeriesDataset::test(&series, metadata.window, metadata.stats)
        .context("Failed to build test split")?;

    println!("Evaluating {} test windows...", test.len());
    let report = evaluate(&model, &test, &device).context("Evaluation failed")?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    println!("\nTest split ({} windows):", report.n_windows);
    println!("  MAE:  {:.4} °C", report.mae);
    println!("  RMSE: {:.4} °C", report.rmse);
    println!("\nFirst window:");
    println!("  {:>4}  {:>9}  {:>9}", "Hour", "Real", "Predicted");
    for (h, (real, pred)) in report
        .first_target
        .iter()
        .zip(&report.first_prediction)
        .enumerate()
    {
        println!("  {:>4}  {:>9.2}  {:>9.2}", h, real, pred);
    }
}

/// Forecast payload for `predict --json`.
#[derive(Serialize)]
struct ForecastPayload {
    forecast_hours: usize,
    temperatures: Vec<f32>,
    timestamps: Vec<String>,
    unit: &'static str,
    generated_at: String,
}

/// Hourly timestamps starting at `start`.
fn hourly_timestamps(start: DateTime<Local>, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| (start + Duration::hours(i as i64)).format("%Y-%m-%d %H:%M").to_string())
        .collect()
}

fn handle_predict(data: &Path, checkpoint: &CheckpointArgs, json: bool) -> Result<()> {
    let predictor =
        Predictor::<InferenceBackend>::load(&checkpoint.checkpoint_dir, &checkpoint.name, &Default::default())
            .with_context(|| {
                format!(
                    "Failed to load checkpoint '{}' from {}",
                    checkpoint.name,
                    checkpoint.checkpoint_dir.display()
                )
            })?;

    let forecast = predictor
        .predict_csv(data)
        .with_context(|| format!("Failed to forecast from {}", data.display()))?;

    let now = Local::now();
    let timestamps = hourly_timestamps(now, forecast.len());

    if json {
        let payload = ForecastPayload {
            forecast_hours: forecast.len(),
            temperatures: forecast.into_vec(),
            timestamps,
            unit: "Celsius",
            generated_at: now.to_rfc3339(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{:>16}  {:>8}", "Time", "Temp °C");
        for (timestamp, value) in timestamps.iter().zip(forecast.iter()) {
            println!("{timestamp:>16}  {value:>8.2}");
        }
    }
    Ok(())
}

fn handle_config(output: Option<PathBuf>) -> Result<()> {
    let config = ExperimentConfig::default();
    match output {
        Some(path) => {
            config
                .to_json_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => println!("{}", config.to_json_string()?),
    }
    Ok(())
}
