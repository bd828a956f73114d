use std::error::Error;

use clap::Parser;
use tessera::{Cli, ServeConfig};
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::default()
            .add_directive("tessera=info".parse()?)
            .add_directive("tessera_stream=info".parse()?)
            .add_directive("tessera_net=warn".parse()?)
            .add_directive(LevelFilter::WARN.into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(false)
        .with_file(false)
        .init();

    let config = ServeConfig::from_cli(Cli::parse())?;
    tessera::run(config).await?;

    Ok(())
}
