//! fieldcycle - run and check cyclic fieldbus master configurations
//!
//! Runs a configuration against the simulated master with the real cycle
//! scheduler, then prints timing statistics and engine counters.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::RunOptions;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "fieldcycle")]
#[command(about = "Run and check cyclic fieldbus master configurations")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a configuration against the simulated master
    Run {
        /// Configuration file (YAML)
        config: PathBuf,

        /// Stop after this many milliseconds
        #[arg(short, long)]
        duration_ms: Option<u64>,

        /// Ignore the configured policy, affinity and memory lock
        #[arg(long)]
        unprivileged: bool,

        /// Simulated reference clock offset (ns)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        reference_offset_ns: i64,

        /// Simulated reference clock drift (ppb)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        drift_ppb: i64,
    },

    /// Parse and validate a configuration file
    Validate {
        /// Configuration file (YAML)
        config: PathBuf,
    },

    /// Print the default cycle section
    Defaults,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fieldcycle={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn execute_command(command: &Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            duration_ms,
            unprivileged,
            reference_offset_ns,
            drift_ppb,
        } => commands::run(
            config,
            &RunOptions {
                duration_ms: *duration_ms,
                unprivileged: *unprivileged,
                reference_offset_ns: *reference_offset_ns,
                drift_ppb: *drift_ppb,
            },
        ),
        Commands::Validate { config } => commands::validate(config),
        Commands::Defaults => commands::defaults(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcycle_test_helpers::prelude::*;

    #[test]
    fn parse_run_with_overrides() -> TestResult {
        let cli = Cli::try_parse_from([
            "fieldcycle",
            "-vv",
            "run",
            "configs/simulated.yaml",
            "--duration-ms",
            "250",
            "--unprivileged",
            "--drift-ppb",
            "-40",
        ])?;
        assert_eq!(cli.verbose, 2);
        let Commands::Run {
            config,
            duration_ms,
            unprivileged,
            reference_offset_ns,
            drift_ppb,
        } = cli.command
        else {
            return Err("expected run".into());
        };
        assert_eq!(config, PathBuf::from("configs/simulated.yaml"));
        assert_eq!(duration_ms, Some(250));
        assert!(unprivileged);
        assert_eq!(reference_offset_ns, 0);
        assert_eq!(drift_ppb, -40);
        Ok(())
    }

    #[test]
    fn parse_validate_requires_path() {
        assert!(Cli::try_parse_from(["fieldcycle", "validate"]).is_err());
    }

    #[test]
    fn unbounded_run_is_rejected() -> TestResult {
        let dir = std::env::temp_dir().join(format!("fieldcycle-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("unbounded.yaml");
        std::fs::write(&path, SAMPLE_YAML)?;

        let err = must_err(commands::run(&path, &RunOptions::default()));
        let cli_err = must_some(err.downcast_ref::<CliError>(), "cli error");
        assert!(matches!(cli_err, CliError::UnboundedRun));
        assert_eq!(cli_err.exit_code(), 2);

        commands::validate(&path)?;
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn bounded_simulated_run_completes() -> TestResult {
        let dir = std::env::temp_dir().join(format!("fieldcycle-cli-run-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("bounded.yaml");
        std::fs::write(&path, SAMPLE_YAML)?;

        commands::run(
            &path,
            &RunOptions {
                duration_ms: Some(20),
                unprivileged: true,
                reference_offset_ns: 1_500,
                drift_ppb: 20,
            },
        )?;
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn shipped_config_validates() -> TestResult {
        let config = fieldcycle_engine::FieldcycleConfig::from_yaml_str(include_str!(
            "../../../configs/simulated.yaml"
        ))?;
        let topology = config.validate()?;
        assert_eq!(topology.len(), 2);
        assert_eq!(config.cycle.run_duration_ms, Some(5000));
        Ok(())
    }

    #[test]
    fn invalid_yaml_maps_to_config_exit_code() {
        let err = CliError::from(fieldcycle_errors::ValidationError::invalid_enum(
            "observability.sink",
            "prometheus",
            "log, null",
        ));
        assert_eq!(err.exit_code(), 4);
    }
}
