//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::unit_table::UnitTable;
use crate::domain::algorithm::AlgorithmCache;
use crate::domain::config_validation::{parse_date, parse_limit, validate_config};
use crate::domain::decimal::Decimal;
use crate::domain::error::ImpactError;
use crate::domain::internal_value::InternalValue;
use crate::domain::rejection::rejected_input;
use crate::domain::runner::{AlgorithmRunner, Binding, Bindings, RunnerConfig};
use crate::domain::series::DataSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::record_port::RecordPort;
use crate::ports::unit_port::UnitCatalog;

/// Binding names that carry the evaluation window.
pub const START_BINDING: &str = "startDate";
pub const END_BINDING: &str = "endDate";

#[derive(Parser, Debug)]
#[command(name = "impactcalc", about = "Unit-aware time-series formula evaluator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate algorithms against measurement series
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        /// Algorithm file (repeatable); results print one per line
        #[arg(short, long, required = true)]
        algorithm: Vec<PathBuf>,
        /// Record source to bind as a series (repeatable)
        #[arg(short, long = "series")]
        series: Vec<String>,
        /// Text binding as NAME=VALUE (repeatable)
        #[arg(long = "set")]
        set: Vec<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Integrate a series given in its JSON form
    Integrate {
        #[arg(short, long)]
        series: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Validate a configuration and optionally compile an algorithm
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        algorithm: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            config,
            algorithm,
            series,
            set,
            start,
            end,
        } => run_evaluate(
            &config,
            &algorithm,
            &series,
            &set,
            start.as_deref(),
            end.as_deref(),
        ),
        Command::Integrate { series, start, end } => {
            run_integrate(&series, start.as_deref(), end.as_deref())
        }
        Command::Validate { config, algorithm } => run_validate(&config, algorithm.as_ref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_evaluate(
    config_path: &PathBuf,
    algorithm_paths: &[PathBuf],
    series: &[String],
    sets: &[String],
    start: Option<&str>,
    end: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match evaluate_with_config(&adapter, algorithm_paths, series, sets, start, end) {
        Ok(results) => {
            for result in results {
                println!("{result}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", describe_failure(&e));
            (&e).into()
        }
    }
}

/// Loads records once and evaluates each algorithm named on the command line
/// in order, stopping at the first failure.
///
/// Every algorithm sees its own copy of the bound series, so window changes
/// made by one script do not reach the next. Files with identical source are
/// compiled once.
pub fn evaluate_with_config(
    adapter: &dyn ConfigPort,
    algorithm_paths: &[PathBuf],
    series: &[String],
    sets: &[String],
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<String>, ImpactError> {
    validate_config(adapter)?;
    let runner = AlgorithmRunner::with_config(&build_runner_config(adapter)?);
    let units = UnitTable::from_config(adapter)?;
    let window = build_window(adapter, start, end)?;

    let records: Option<CsvAdapter> = if series.is_empty() {
        None
    } else {
        Some(CsvAdapter::new(data_dir(adapter)?))
    };
    let sets = sets
        .iter()
        .map(|s| parse_set(s))
        .collect::<Result<Vec<_>, _>>()?;

    let mut bindings = match &records {
        Some(port) => build_bindings(port, &units, series, window)?,
        None => window_bindings(window),
    };
    for (name, value) in sets {
        bindings.insert(name, Binding::Text(value));
    }

    let mut cache = AlgorithmCache::new();
    let mut results = Vec::with_capacity(algorithm_paths.len());
    for path in algorithm_paths {
        let source = fs::read_to_string(path)?;
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "algorithm".to_string());
        let algorithm = cache.get_or_compile(&runner, &label, &source)?;
        results.push(runner.evaluate(&algorithm, &isolated(&bindings))?);
    }
    Ok(results)
}

/// A copy of `bindings` whose series no longer share state with the originals.
fn isolated(bindings: &Bindings) -> Bindings {
    bindings
        .iter()
        .map(|(name, binding)| {
            let binding = match binding {
                Binding::Series(handle) => Binding::Series(handle.detached()),
                other => other.clone(),
            };
            (name.clone(), binding)
        })
        .collect()
}

/// The message printed for a failed evaluation.
///
/// A deliberate rejection raised by the formula is reported as
/// `rejected: <message>`; everything else as `error: <error>`.
pub fn describe_failure(err: &ImpactError) -> String {
    match rejected_input(err) {
        Some(rejection) => format!("rejected: {}", rejection.message),
        None => format!("error: {err}"),
    }
}

pub fn build_runner_config(adapter: &dyn ConfigPort) -> Result<RunnerConfig, ImpactError> {
    let defaults = RunnerConfig::default();
    let limit = |key: &str, default: u64| -> Result<u64, ImpactError> {
        match adapter.get_string("engine", key) {
            Some(value) => parse_limit(&value, key),
            None => Ok(default),
        }
    };
    let size = |key: &str, default: usize| -> Result<usize, ImpactError> {
        let value = limit(key, default as u64)?;
        usize::try_from(value).map_err(|_| ImpactError::ConfigInvalid {
            section: "engine".into(),
            key: key.into(),
            reason: format!("{key} is too large"),
        })
    };

    Ok(RunnerConfig {
        max_operations: limit("max_operations", defaults.max_operations)?,
        max_call_levels: size("max_call_levels", defaults.max_call_levels)?,
        max_expr_depth: size("max_expr_depth", defaults.max_expr_depth)?,
        max_string_size: size("max_string_size", defaults.max_string_size)?,
    })
}

/// Resolves the evaluation window; command-line bounds override `[window]`.
pub fn build_window(
    adapter: &dyn ConfigPort,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ImpactError> {
    let bound = |arg: Option<&str>, key: &str| -> Result<DateTime<Utc>, ImpactError> {
        let value = match arg {
            Some(v) => v.to_string(),
            None => adapter
                .get_string("window", key)
                .ok_or_else(|| ImpactError::ConfigMissing {
                    section: "window".into(),
                    key: key.into(),
                })?,
        };
        parse_date(&value).ok_or_else(|| ImpactError::ConfigInvalid {
            section: "window".into(),
            key: key.into(),
            reason: format!("invalid date {value:?}"),
        })
    };

    let start_date = bound(start, "start_date")?;
    let end_date = bound(end, "end_date")?;
    if start_date >= end_date {
        return Err(ImpactError::ConfigInvalid {
            section: "window".into(),
            key: "start_date".into(),
            reason: "start_date must be before end_date".into(),
        });
    }
    Ok((start_date, end_date))
}

pub fn data_dir(adapter: &dyn ConfigPort) -> Result<PathBuf, ImpactError> {
    adapter
        .get_string("data", "dir")
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ImpactError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

/// Splits `NAME=VALUE`. The name must be non-empty; the value may be.
pub fn parse_set(arg: &str) -> Result<(String, String), ImpactError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(ImpactError::ConfigInvalid {
            section: "cli".into(),
            key: "set".into(),
            reason: format!("expected NAME=VALUE, got {arg:?}"),
        }),
    }
}

fn window_bindings((start, end): (DateTime<Utc>, DateTime<Utc>)) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert(START_BINDING.to_string(), Binding::Instant(start));
    bindings.insert(END_BINDING.to_string(), Binding::Instant(end));
    bindings
}

/// Binds each named record source, normalised into the window, plus the
/// window bounds as `startDate` and `endDate`.
pub fn build_bindings(
    records: &dyn RecordPort,
    catalog: &dyn UnitCatalog,
    names: &[String],
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Bindings, ImpactError> {
    let mut bindings = window_bindings(window);
    for name in names {
        let values = records.fetch_records(name)?;
        let value = InternalValue::from_records(&values, window.0, window.1, catalog).map_err(
            |e| match e {
                ImpactError::NoRecords { .. } => ImpactError::NoRecords {
                    label: name.clone(),
                },
                other => other,
            },
        )?;
        bindings.insert(name.clone(), Binding::from(value));
    }
    Ok(bindings)
}

fn run_integrate(series: &str, start: Option<&str>, end: Option<&str>) -> ExitCode {
    match integrate_series(series, start, end) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn integrate_series(
    json: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Decimal, ImpactError> {
    let mut series = DataSeries::from_json(json)?;
    if let Some(start) = start {
        series.set_series_start_date(parse_arg_date(start, "start")?);
    }
    if let Some(end) = end {
        series.set_series_end_date(parse_arg_date(end, "end")?);
    }
    series.integrate()
}

fn parse_arg_date(value: &str, key: &str) -> Result<DateTime<Utc>, ImpactError> {
    parse_date(value).ok_or_else(|| ImpactError::ConfigInvalid {
        section: "cli".into(),
        key: key.into(),
        reason: format!("invalid date {value:?}, expected YYYY-MM-DD or RFC 3339"),
    })
}

fn run_validate(config_path: &PathBuf, algorithm_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_with_config(&adapter, algorithm_path.map(PathBuf::as_path)) {
        Ok(()) => {
            println!("Configuration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn validate_with_config(
    adapter: &dyn ConfigPort,
    algorithm_path: Option<&Path>,
) -> Result<(), ImpactError> {
    validate_config(adapter)?;
    let runner_config = build_runner_config(adapter)?;
    let units = UnitTable::from_config(adapter)?;
    eprintln!("Loaded {} unit conversion factors", units.len());

    if adapter.get_string("data", "dir").is_some() {
        let sources = CsvAdapter::new(data_dir(adapter)?).list_sources()?;
        eprintln!("Found {} record sources: {}", sources.len(), sources.join(", "));
    }

    if let Some(path) = algorithm_path {
        let source = fs::read_to_string(path)?;
        let runner = AlgorithmRunner::with_config(&runner_config);
        runner.compile(&path.display().to_string(), &source)?;
        eprintln!("Algorithm {} compiles", path.display());
    }
    Ok(())
}
