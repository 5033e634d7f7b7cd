//! Harness entry point
//!
//! Loads the configuration, parses the scenario files named on the command
//! line, runs them serially, writes the JSON run report, and exits nonzero
//! when any scenario failed so CI pipelines can gate on the result.
//!
//! ## Environment variables
//! All optional, prefixed `DASHPROBE_`:
//! - `DASHPROBE_CHROME_PATH`: browser executable to launch
//! - `DASHPROBE_CDP_ENDPOINT`: attach to a running browser instead of launching
//! - `DASHPROBE_ARTIFACT_DIR`: where screenshots and console logs are written
//! - `DASHPROBE_REPORT_PATH`: where the JSON run report is written
//! - `DASHPROBE_LOG_LEVEL`: log level when `RUST_LOG` is unset

use dashprobe::config::Config;
use dashprobe::scenario::{Scenario, ScenarioRunner};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    // Initialize tracing - RUST_LOG wins over the configured level
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .or_else(|| config.log_level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Dashprobe v{}", dashprobe::VERSION);

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: dashprobe <scenario.toml> [<scenario.toml> ...]");
        return ExitCode::from(2);
    }

    let mut scenarios = Vec::with_capacity(paths.len());
    for path in &paths {
        match Scenario::from_path(path) {
            Ok(scenario) => {
                info!("Loaded scenario {} from {}", scenario.name, path);
                scenarios.push(scenario);
            }
            Err(e) => {
                error!("Cannot load {}: {}", path, e);
                return ExitCode::from(2);
            }
        }
    }

    let runner = ScenarioRunner::new(config.clone());
    let report = runner.run(&scenarios).await;

    let report_path = config.report_path();
    if let Err(e) = report.write_to_path(&report_path).await {
        error!("Cannot write run report: {}", e);
        return ExitCode::FAILURE;
    }

    if report.all_passed() {
        info!("All {} scenarios passed", report.total);
        ExitCode::SUCCESS
    } else {
        error!("{} of {} scenarios failed", report.failed, report.total);
        ExitCode::FAILURE
    }
}
