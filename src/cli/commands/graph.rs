//! Graph command - print dependency graphs without touching anything

use crate::cli::args::GraphArgs;
use crate::cli::commands::{prepare_runner, Overrides};
use crate::config::{Config, ConfigManager};
use crate::error::CacheResult;

/// Execute the graph command
pub fn execute(args: GraphArgs, manager: &ConfigManager, config: &Config) -> CacheResult<()> {
    let configuration = manager.select(config, &args.configuration)?;
    let overrides = Overrides {
        storage: args.storage,
        destination: None,
    };

    let mut runner = prepare_runner(manager, config, configuration, overrides)?;
    print!("{}", runner.describe(&config.targets, args.evaluate)?);
    Ok(())
}
