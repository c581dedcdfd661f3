// Command routing and dispatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use revisor_config::{ConfigLoader, VersioningConfig};

use crate::commands::{Command, ConfigCommand, PathsCommand, ReplayCommand};
use crate::error::CliResult;

/// revisor - flag-driven undo, redo, goto and restore for documents
#[derive(Parser, Debug)]
#[command(name = "revisor")]
#[command(bin_name = "revisor")]
#[command(about = "Flag-driven undo, redo, goto and restore for documents")]
#[command(
    long_about = "revisor replays document writes through the versioning handler.\n\nDocuments request history operations by setting control fields (restore, goto, undo, redo);\nthe handler keeps an ordered log per document under the history root.\n\nConfiguration comes from an optional TOML file and the environment\n(COLLECTION, HISTORY_COLLECTION, ENABLE_RESTORE, *_FIELD, IGNORE_FIELDS)."
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Replay a JSON-lines write log against a store snapshot
    Replay {
        /// JSON object mapping document paths to document bodies
        #[arg(long, value_name = "FILE")]
        store: PathBuf,

        /// JSON-lines write log (set, update, delete)
        #[arg(long, value_name = "FILE")]
        events: PathBuf,

        /// Where to write the final snapshot (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show where a document's history is kept
    Paths {
        /// Document path, e.g. documents/d1
        #[arg(value_name = "DOC_PATH")]
        doc_path: String,
    },

    /// Print the effective configuration
    Config,
}

/// Routes parsed arguments to command handlers
pub struct CommandRouter;

impl CommandRouter {
    /// Load configuration for the invocation
    pub fn load_config(cli: &Cli) -> CliResult<VersioningConfig> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &cli.config {
            loader = loader.with_file(path);
        }
        Ok(loader.load()?)
    }

    /// Build the handler for a command
    pub fn command(cli: &Cli, config: VersioningConfig) -> Box<dyn Command> {
        match &cli.command {
            Commands::Replay {
                store,
                events,
                output,
            } => Box::new(ReplayCommand::new(
                store.clone(),
                events.clone(),
                output.clone(),
                config,
            )),
            Commands::Paths { doc_path } => Box::new(PathsCommand::new(doc_path.clone(), config)),
            Commands::Config => Box::new(ConfigCommand::new(config)),
        }
    }

    /// Execute the parsed command
    pub async fn execute(cli: &Cli) -> CliResult<()> {
        let config = Self::load_config(cli)?;
        Self::command(cli, config).execute().await
    }
}
