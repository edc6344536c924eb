use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use marker_locator::calib::MissingGroundTruth;
use marker_locator::{
    CalibrationConfig, CalibrationParameters, CalibrationRecord, CalibrationResult, Detection,
    LevelCheckpoint, LocationExtractor,
};
use serde::Serialize;

/// Locate decoded markers and calibrate the projection model.
#[derive(Debug, Parser)]
#[command(author, version, about = "Marker location and calibration search")]
struct Args {
    /// Log verbosity.
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines (filter with RUST_LOG).
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search calibration parameters and write a calibration record.
    Calibrate {
        /// Path to JSON file containing a CalibrationConfig.
        #[arg(long)]
        config: PathBuf,

        /// Record path. Overrides `output_path` from the config.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the latest level checkpoint to this JSON file.
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Continue from a checkpoint written by an earlier run.
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// Compute locations for detections with a calibration record.
    Locate {
        /// Calibration record written by `calibrate`.
        #[arg(long)]
        record: PathBuf,

        /// Path to JSON array of detections.
        #[arg(long)]
        detections: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Serialize)]
struct CalibrationSummary<'a> {
    parameters: &'a CalibrationParameters,
    total_error: f64,
    initial_error: f64,
    levels: usize,
    record: &'a Path,
    missing_ground_truth: &'a [MissingGroundTruth],
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn run_calibration(
    config: &CalibrationConfig,
    checkpoint_path: Option<&Path>,
    resume_from: Option<&LevelCheckpoint>,
) -> Result<CalibrationResult, Box<dyn Error>> {
    let search = config.build_search()?;
    let mut write_error = None;
    let observer = |checkpoint: &LevelCheckpoint| {
        let Some(path) = checkpoint_path else {
            return;
        };
        if write_error.is_none() {
            if let Err(err) = checkpoint.write_json(path) {
                write_error = Some(err);
            }
        }
    };

    let result = match resume_from {
        Some(checkpoint) => {
            info!("resuming after level {}", checkpoint.level + 1);
            search.resume(checkpoint, observer)?
        }
        None => search.run_with_observer(config.initial_guess, observer)?,
    };
    if let Some(err) = write_error {
        return Err(format!("failed to write checkpoint: {err}").into());
    }
    Ok(result)
}

fn calibrate_from_files(
    config_path: &Path,
    output: Option<&Path>,
    checkpoint: Option<&Path>,
    resume: Option<&Path>,
) -> Result<String, Box<dyn Error>> {
    let config = CalibrationConfig::load_json(config_path)?;
    let resume_from = resume
        .map(LevelCheckpoint::load_json)
        .transpose()?;

    let result = run_calibration(&config, checkpoint, resume_from.as_ref())?;

    let record_path = output.map(Path::to_path_buf).unwrap_or_else(|| config.output_path());
    CalibrationRecord::from(&result).write(&record_path)?;
    info!("calibration record written to {}", record_path.display());

    let summary = CalibrationSummary {
        parameters: &result.parameters,
        total_error: result.total_error,
        initial_error: result.initial_error,
        levels: result.levels.len(),
        record: &record_path,
        missing_ground_truth: &result.missing_ground_truth,
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn locate_from_files(record_path: &Path, detections_path: &Path) -> Result<String, Box<dyn Error>> {
    let record = CalibrationRecord::load(record_path)?;
    let detections: Vec<Detection> = load_json_file(detections_path)?;
    let extraction = LocationExtractor::new(record.parameters).process(&detections);
    info!(
        "{} locations, {} detections skipped",
        extraction.locations.len(),
        extraction.skipped
    );
    Ok(serde_json::to_string_pretty(&extraction)?)
}

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        marker_locator::core::init_tracing(args.json_logs);
        log::set_max_level(args.log_level.into());
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        marker_locator::core::init_with_level(args.log_level.into())?;
        Ok(())
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let json = match &args.command {
        Command::Calibrate {
            config,
            output,
            checkpoint,
            resume,
        } => calibrate_from_files(
            config,
            output.as_deref(),
            checkpoint.as_deref(),
            resume.as_deref(),
        )?,
        Command::Locate { record, detections } => locate_from_files(record, detections)?,
    };
    println!("{json}");
    Ok(())
}
