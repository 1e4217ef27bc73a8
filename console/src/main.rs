use clap::Parser;
use config::Options;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = Options::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(options.log_level.clone())),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Holos Console");

    holos_console::run_server(options).await
}
