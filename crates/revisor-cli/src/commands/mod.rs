// Command handlers for the revisor CLI

pub mod config;
pub mod paths;
pub mod replay;

pub use config::ConfigCommand;
pub use paths::PathsCommand;
pub use replay::{replay, ReplayCommand, ReplayOutcome, WriteOp};

use crate::error::CliResult;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self) -> CliResult<()>;
}
