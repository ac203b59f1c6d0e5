//! xccache CLI entry point

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use xccache::cli::{Cli, Commands, LogFormat};
use xccache::config::ConfigManager;
use xccache::error::CacheResult;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("xccache=warn"),
        1 => EnvFilter::new("xccache=info"),
        _ => EnvFilter::new("xccache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let manager = match cli.cachefile {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    match cli.command {
        Commands::Config(args) => xccache::cli::commands::config(args, &manager),
        Commands::Inject(args) => {
            let config = manager.load()?;
            xccache::cli::commands::inject(args, &manager, &config)
        }
        Commands::Graph(args) => {
            let config = manager.load()?;
            xccache::cli::commands::graph(args, &manager, &config)
        }
    }
}
