//! plan-gen
//!
//! Usage:
//!   plan-gen mission --start "40.0, -105.0" --end "40.01, -105.0" --altitude 100 --unit feet
//!   plan-gen security --kml site.kml --random 8 --buffer 10 --aircraft vtol

use anyhow::Result;
use clap::Parser;
use mission_cli::{run, Cli};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mission_cli=info".parse()?)
                .add_directive("mission_terrain=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling plan generation");
            on_interrupt.cancel();
        }
    });

    tracing::info!(scenario = cli.command.name(), aircraft = %cli.common.aircraft, "Generating plan");
    let path = run(&cli, &cancel).await?;
    println!("{}", path.display());
    Ok(())
}
