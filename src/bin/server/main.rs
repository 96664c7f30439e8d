mod face;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use face::AppState;
use schema_migrator::{Config, Migrator};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP API for script-to-schema migration.
#[derive(Parser, Debug)]
#[command(name = "server", version)]
struct Args {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Misconfiguration stops startup; a flaky model only degrades requests.
    let config = Config::from_env().context("Invalid migrator configuration")?;
    let migrator = Migrator::from_config(&config).context("Failed to set up migrator")?;

    let app = face::router(AppState {
        migrator: Arc::new(migrator),
    });

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Could not bind to {}", addr))?;

    tracing::info!("Migration API running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
