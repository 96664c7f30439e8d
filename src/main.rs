use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use schema_migrator::{Config, Migrator};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Migrate a Playwright/Selenium script into a step schema JSON file.
#[derive(Parser, Debug)]
#[command(name = "schema-migrator", version)]
struct Cli {
    /// Script to migrate.
    #[arg(env = "SCRIPT_PATH")]
    script: PathBuf,

    /// Where to write the schema.
    #[arg(short, long, env = "OUTPUT_PATH", default_value = "migrated_schema.json")]
    output: PathBuf,

    /// Skip the language model and use only the deterministic fallback.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let migrator = if cli.offline {
        Migrator::offline()
    } else {
        let config = Config::from_env().context("Invalid migrator configuration")?;
        Migrator::from_config(&config).context("Failed to set up migrator")?
    };

    tracing::info!(script = %cli.script.display(), "Migrating script");
    let schema = migrator
        .migrate_file(&cli.script, &cli.output)
        .await
        .with_context(|| format!("Error during migration of {}", cli.script.display()))?;

    let steps = schema.first().map(|doc| doc.steps.len()).unwrap_or(0);
    println!("Migration Summary:");
    println!("- Generated {} steps", steps);
    println!("- Output saved to: {}", cli.output.display());

    Ok(())
}
