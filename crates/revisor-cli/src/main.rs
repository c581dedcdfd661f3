//! revisor - replay document writes through the versioning handler

use anyhow::Result;
use clap::Parser;
use revisor_cli::{logging, Cli, CommandRouter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = CommandRouter::execute(&cli).await {
        tracing::error!(error = %e, "Command failed");
        anyhow::bail!(e.user_message());
    }
    Ok(())
}
