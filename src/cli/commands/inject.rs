//! Inject command - replace cacheable dependencies with prebuilt artifacts

use crate::cli::args::InjectArgs;
use crate::cli::commands::{prepare_runner, Overrides};
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;
use console::style;
use tracing::info;

/// Execute the inject command
pub fn execute(args: InjectArgs, manager: &ConfigManager, config: &Config) -> CacheResult<()> {
    let configuration = manager.select(config, &args.configuration)?;
    info!(
        "Injecting {} target(s) for {}",
        config.targets.len(),
        configuration.build_configuration
    );

    let overrides = Overrides {
        storage: args.storage,
        destination: args.destination,
    };
    let mut runner = prepare_runner(manager, config, configuration, overrides)?;
    let report = runner.run(&manager.resolve_targets(&config.targets))?;

    println!(
        "{} {} unpacked, {} rebuilt, {} target(s) replaced",
        style("Done:").green().bold(),
        report.unpacked.len(),
        report.rebuilt.len(),
        report.removed_targets
    );
    for name in &report.rebuilt {
        println!("  {} {}", style("rebuilt").yellow(), name);
    }
    Ok(())
}
