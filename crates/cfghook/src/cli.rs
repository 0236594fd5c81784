use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cfghookd: configuration backend plugin host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Backend configuration file (JSON, TOML or YAML)
    #[arg(short = 'f', long, global = true)]
    pub config: Option<PathBuf>,

    /// Application plugin directory, overrides the configuration file
    #[arg(short = 'd', long, global = true)]
    pub plugin_dir: Option<PathBuf>,

    /// System plugin directory, loaded before the application plugins
    #[arg(long, global = true)]
    pub system_dir: Option<PathBuf>,

    /// Plugin (file stem) loaded first with globally visible symbols
    #[arg(long, global = true)]
    pub master: Option<String>,

    /// Debug logging
    #[arg(short = 'D', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, initialize and start every plugin, then wait for Ctrl-C
    Run {
        /// Shut down right after start instead of waiting
        #[arg(long)]
        once: bool,

        /// Run the reset hooks before start
        #[arg(long)]
        reset: bool,

        /// Arguments handed to every start hook
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// List loaded plugins, their hooks and dependencies
    List,
    /// Run one commit cycle over a change set file
    Commit {
        /// JSON change set
        #[arg(short, long)]
        changes: PathBuf,

        /// Stop after validation
        #[arg(long)]
        validate_only: bool,
    },
}
