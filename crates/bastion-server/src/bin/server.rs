//! Bastion Server Binary

use anyhow::Result;
use bastion_server::config::{validate_config, ConfigLoader};
use bastion_server::Server;
use clap::Parser;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "bastion-server", version, about = "RBAC gateway with an audit trail")]
struct Cli {
    /// Configuration file layered over the built-in defaults.
    #[arg(short, long, env = "BASTION_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_config_path(path);
    }
    let config = loader.load()?;

    bastion_common_log::init(config.logging.log_config())?;

    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            error!(error = %err, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s)", errors.len());
    }

    info!("Starting Bastion Server v{}", env!("CARGO_PKG_VERSION"));

    let server = Server::new(config).await?;
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}
