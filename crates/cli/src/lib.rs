pub mod commands;

use clap::{Parser, Subcommand};
use perch_core::config::{AppConfig, LoadOptions, LogFormat};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "perch",
    about = "Perch operator CLI",
    long_about = "Operate Perch readiness checks, database bootstrap, and config inspection.",
    after_help = "Examples:\n  perch doctor --json\n  perch seed\n  perch config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Run preflight checks (config, env completeness, toolbox, credentials) and report pass/fail"
    )]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Bootstrap the boutique catalog database: migrate, seed, verify")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

// Best effort: operator commands still run (and report) when the config
// itself is broken, so logging falls back to defaults in that case.
fn init_logging() {
    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| {
            perch_core::config::LoggingConfig { level: "info".to_string(), format: LogFormat::Compact }
        });

    let log_level = logging.level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);

    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);
    let result = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // A second init (e.g. under tests) is harmless.
    let _ = result;
}
