use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use shuttle::files::DiskFiles;
use shuttle::{Config, Router, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "shuttle=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::parse();
    tracing::info!(directory = %config.directory.display(), "serving files");

    let server = Server::bind(config.address(), config.server_options()).await?;
    server
        .run(Router::new(config.router_config(), DiskFiles))
        .await?;
    Ok(())
}
