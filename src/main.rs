//! devbot entrypoint.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use devbot::cli::{Cli, Commands};
use devbot::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devbot=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Some(Commands::Eval { expression }) => devbot::cli::eval::cmd_eval(expression, &config).await,
        Some(Commands::Run) | None => devbot::bot::run(config).await.map_err(Into::into),
    }
}
