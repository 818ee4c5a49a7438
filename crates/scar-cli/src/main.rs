//! Scene Archive Studio CLI.

use clap::Parser;

mod cli;
mod commands;
mod logging;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{run_info, run_load};
use crate::logging::{LogConfig, LogFormat, init_logging};
use crate::summary::print_summary;

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let exit_code = match cli.command {
        Command::Load(args) => match run_load(&args) {
            Ok(result) => {
                print_summary(&result);
                i32::from(result.has_errors())
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Info(args) => match run_info(&args) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        log_file: cli.log_file.clone(),
    }
}
