//! dynatables-reflect
//!
//! Discovers the tables of the configured deployment and prints the
//! logical -> physical mapping as JSON.
//!
//! Usage: dynatables-reflect [config.yaml]

use dynatables::utils::bootstrap::init_tracing;
use dynatables::{Config, Tables};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;
    info!(mode = ?config.mode, deployment = ?config.deployment, "Starting reflect");

    let tables = Tables::connect(config).await;
    let client = match tables.client().await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Discovery failed");
            return Err(e.into());
        }
    };

    let mapping = client.reflect().await;
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}
