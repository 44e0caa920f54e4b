//! Mercury gateway server binary.
//!
//! Reads configuration from the TOML file named by `MERCURY_CONFIG`
//! (defaults apply when unset), loads credentials from the environment,
//! and serves until terminated.

use std::path::Path;

use mercury::{Credentials, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var_os("MERCURY_CONFIG") {
        Some(path) => {
            let path = Path::new(&path);
            tracing::info!(config = %path.display(), "loading configuration");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };

    let credentials = Credentials::from_env();

    tracing::info!("mercury gateway starting");
    mercury::server::run(config, credentials).await.map_err(|e| {
        tracing::error!(error = %e, "mercury gateway exited with error");
        e
    })
}
