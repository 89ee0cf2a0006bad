//! Interaction demo binary.
//!
//! Builds a small world, runs one requester against the authority and prints
//! every bus event to stdout as a JSON line. Logs go to stderr.
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=debug INTERACTION_DETECTION=ray cargo run -p interaction-client
//! ```

use anyhow::Result;

use interaction_client::{DemoConfig, logging, scenario};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = DemoConfig::from_env()?;
    logging::setup_logging()?;

    tracing::info!(
        tick_rate_hz = config.runtime.tick_rate_hz,
        range = config.runtime.interaction.range,
        detection = ?config.runtime.interaction.detection,
        "starting interaction demo"
    );

    let summary = scenario::run(config).await?;
    println!("{}", serde_json::to_string(&summary)?);

    tracing::info!("demo finished");
    Ok(())
}
