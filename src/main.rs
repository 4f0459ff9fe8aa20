use std::{
    panic,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use uuid::Uuid;

use bulwark::{
    cli::{Cli, Commands},
    BackgroundLog, Bulwark, LiveHost, MultiLogger, RunReport, StepOutcome, BULWARK_VERSION,
};
use bulwark_api::{
    config::ProvisionConfig,
    constants::BULWARK_BACKGROUND_LOG_PATH,
    error::{BulwarkError, BulwarkResultExt, InternalError},
};

fn print_plan(report: &RunReport) {
    for record in &report.steps {
        let marker = match record.outcome {
            StepOutcome::Skipped => "ok",
            _ => "run",
        };
        println!("{marker:>4}  {:<14} {}", record.subsystem, record.step);
    }
    println!("{}", report.summary());
}

fn write_error(path: &Path, e: &BulwarkError) {
    match serde_yaml::to_string(e) {
        Ok(yaml) => {
            if let Err(write_error) = std::fs::write(path, yaml) {
                error!("Failed to write error to '{}': {write_error}", path.display());
            }
        }
        Err(serialize_error) => error!("Failed to serialize error: {serialize_error}"),
    }
}

fn provision(
    config: &Path,
    confirm_wipe: Option<&str>,
    series: Option<&str>,
    report_path: Option<&PathBuf>,
) -> Result<(), BulwarkError> {
    let bulwark = Bulwark::load(config)?;
    let mut host = LiveHost::new(confirm_wipe.map(str::to_owned));

    let (res, report) = bulwark.provision(&mut host, series);
    if let (Some(path), Some(report)) = (report_path, report) {
        if let Err(e) = report.write(path) {
            error!("{e:?}");
        }
    }
    res
}

fn run_bulwark(args: &Cli) -> Result<(), BulwarkError> {
    // Log version ASAP
    info!("Bulwark version: {BULWARK_VERSION}");

    match &args.command {
        Commands::Validate { config } => {
            Bulwark::load(config)?;
            info!("Configuration '{}' is valid", config.display());
            Ok(())
        }

        Commands::Series { config, series } => {
            let bulwark = match config {
                Some(path) => Bulwark::load(path)?,
                None => Bulwark::new(ProvisionConfig::default()),
            };
            println!(
                "{}",
                bulwark.series(&mut LiveHost::new(None), series.as_deref())?
            );
            Ok(())
        }

        Commands::Plan { config, series } => {
            let report = Bulwark::load(config)?.plan(&mut LiveHost::new(None), series.as_deref())?;
            print_plan(&report);
            Ok(())
        }

        Commands::Provision {
            config,
            confirm_wipe,
            series,
            report,
            error,
        } => {
            let res = panic::catch_unwind(|| {
                provision(config, confirm_wipe.as_deref(), series.as_deref(), report.as_ref())
            })
            .unwrap_or_else(|e| Err(BulwarkError::new(InternalError::Panic(format!("{e:?}")))));

            if let (Some(path), Err(e)) = (error, &res) {
                write_error(path, e);
            }

            res.message(format!("Failed to execute '{}' command", args.command))
        }
    }
}

fn setup_logging(args: &Cli, run_id: Uuid) -> Result<(), Error> {
    let mut multilogger = MultiLogger::new()
        // Add regular env_logger to output to stderr
        .with_logger(Box::new(
            env_logger::builder()
                .format_timestamp(None)
                .filter_level(args.verbosity)
                .build(),
        ))
        .with_target_filter("reqwest", LevelFilter::Debug)
        .with_target_filter("hyper", LevelFilter::Info);

    // Only provisioning runs keep a background log
    let mut background_error = None;
    if matches!(args.command, Commands::Provision { .. }) {
        match BackgroundLog::create(BULWARK_BACKGROUND_LOG_PATH, run_id) {
            Ok(log) => multilogger.add_logger(log.into_logger()),
            Err(e) => background_error = Some(e),
        }
    }

    multilogger.init().context("Logger already registered")?;

    if let Some(e) = background_error {
        warn!("Background log is disabled: {e:#}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let run_id = Uuid::new_v4();

    if let Err(e) = setup_logging(&args, run_id) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(1);
    }
    info!("Starting '{}' run {run_id}", args.command);

    if let Err(e) = run_bulwark(&args) {
        error!("Bulwark failed: {e:?}");
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
