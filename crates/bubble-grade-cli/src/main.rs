//! Bubble Grade CLI - Grade photographed multiple-choice answer sheets.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{detect, grade, Cli, Commands, ExitCode};
use config::AppConfig;

fn run_grade(args: grade::GradeArgs, config: &AppConfig) -> ExitCode {
    let args = grade::GradeArgs::with_config(args, config);
    match grade::run(&args) {
        Ok(summary) => {
            info!(
                "Done: {} graded, {} rejected, {} skipped",
                summary.graded, summary.rejected, summary.skipped
            );
            summary.exit_code
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::Error
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let exit_code = match cli.command {
        Some(Commands::Grade(args)) => run_grade(args, &config),
        Some(Commands::Detect(args)) => {
            let args = detect::DetectArgs::with_config(args, &config);
            match detect::run(&args) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    ExitCode::Error
                }
            }
        }
        None => {
            // Default behavior: run grade with flattened args
            if cli.grade.sheets.paths.is_empty() {
                eprintln!("error: No paths specified. Use --help for usage information.");
                return ExitCode::Error.into();
            }
            run_grade(cli.grade, &config)
        }
    };

    exit_code.into()
}
