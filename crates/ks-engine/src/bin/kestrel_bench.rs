use anyhow::Context;
use tracing_subscriber::EnvFilter;

use ks_engine::{run_sessions, EngineConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args().nth(1);
    let config = EngineConfig::load(path.as_deref()).context("failed to load engine configuration")?;
    let reports = run_sessions(&config).context("benchmark sessions failed")?;

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
