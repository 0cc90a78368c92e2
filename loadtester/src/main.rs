use std::sync::Arc;

use anyhow::Context;
use goose::prelude::*;
use loadtester::scenario;
use loadtester::settings::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("Failed to load settings")?;
    let settings = Arc::new(settings);

    let mut attack = GooseAttack::initialize()?;
    for scenario in scenario::all(&settings)? {
        attack = attack.register_scenario(scenario);
    }
    let metrics = attack.execute().await?;
    tracing::info!(
        requests = metrics.requests.len(),
        "load test finished"
    );
    Ok(())
}
