//! Config command - show or initialize the cache file

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{BuildConfig, Config, ConfigManager};
use crate::error::CacheResult;
use console::style;

/// Execute the config command
pub fn execute(args: ConfigArgs, manager: &ConfigManager) -> CacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(&manager.load()?),
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force)?,
    }

    Ok(())
}

fn show_config(config: &Config) {
    let toml =
        toml::to_string_pretty(config).unwrap_or_else(|_| "Error serializing config".to_string());
    println!("{}", toml);
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

fn init_config(manager: &ConfigManager, force: bool) -> CacheResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        println!(
            "{} Cache file already exists at {}",
            style("Skipped:").yellow(),
            path.display()
        );
        println!("  Use --force to overwrite");
        return Ok(());
    }

    let config = Config {
        configurations: vec![BuildConfig::default()],
        ..Config::default()
    };
    manager.save(&config)?;

    println!("{} {}", style("Cache file initialized:").green(), path.display());
    Ok(())
}
