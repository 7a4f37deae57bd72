//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Chart-of-accounts importer: builds the category hierarchy from a sheet and reconciles it with the store
#[derive(Parser, Debug)]
#[command(name = "coasync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Store file (overrides config)
    #[arg(long, global = true, env = "COASYNC_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import categories from a CSV sheet and reconcile the category tree
    Import {
        /// CSV export of the chart-of-accounts sheet
        #[arg(value_hint = ValueHint::FilePath)]
        source: PathBuf,

        /// Show what would change without writing to the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the persisted category tree
    Tree,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Print a config template
    Template,
}
