use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolcheck::cli::{run, Cli};
use toolcheck::config::Config;
use toolcheck::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolcheck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.apply(Config::from_env());
    tracing::debug!(?config, "Loaded configuration");

    let state = AppState::new(config).await?;
    let output = run(cli.command, &state.repositories).await?;
    println!("{output}");

    Ok(())
}
