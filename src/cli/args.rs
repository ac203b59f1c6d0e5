//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// xccache - build-avoidance cache for Xcode projects
///
/// Replaces dependency targets with prebuilt artifacts and rebuilds only
/// what changed.
#[derive(Parser, Debug)]
#[command(name = "xccache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Cache file path
    #[arg(short = 'f', long, global = true, env = "XCCACHE_CACHEFILE")]
    pub cachefile: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace cacheable dependencies with prebuilt artifacts
    Inject(InjectArgs),

    /// Print the dependency graphs of the configured targets
    Graph(GraphArgs),

    /// Show or initialize the cache file
    Config(ConfigArgs),
}

/// Arguments for the inject command
#[derive(Parser, Debug)]
pub struct InjectArgs {
    /// Configuration from the cache file to inject for
    #[arg(short, long)]
    pub configuration: String,

    /// Artifact store directory (overrides the cache file)
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// xcodebuild destination (overrides the cache file)
    #[arg(long)]
    pub destination: Option<String>,
}

/// Arguments for the graph command
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Configuration from the cache file to query settings with
    #[arg(short, long)]
    pub configuration: String,

    /// Also decide which nodes the store can satisfy
    #[arg(long)]
    pub evaluate: bool,

    /// Artifact store directory (overrides the cache file)
    #[arg(long)]
    pub storage: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the parsed cache file
    Show,

    /// Show cache file path
    Path,

    /// Write a default cache file
    Init {
        /// Overwrite an existing cache file
        #[arg(long)]
        force: bool,
    },
}
