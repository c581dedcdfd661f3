// Show the effective configuration

use async_trait::async_trait;
use revisor_config::VersioningConfig;

use super::Command;
use crate::error::CliResult;

/// Print the loaded configuration as TOML
pub struct ConfigCommand {
    pub config: VersioningConfig,
}

impl ConfigCommand {
    pub fn new(config: VersioningConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> CliResult<()> {
        print!("{}", self.config.to_toml()?);
        Ok(())
    }
}
