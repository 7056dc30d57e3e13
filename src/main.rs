use anyhow::Result;
use tracing::{info, warn};

use mudstone::config::{self, MudConfig};
use mudstone::world::World;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mudstone=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mudstone.toml".to_string());
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %config_path, error = %e, "Config not loaded, using defaults");
            MudConfig::default()
        }
    };

    let world = World::new(config);
    world.init().await?;
    info!("mudstone ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    world.shutdown().await;

    Ok(())
}
