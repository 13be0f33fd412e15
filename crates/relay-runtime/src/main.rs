use std::env;
use std::path::PathBuf;

use relay_core::RelayConfig;
use relay_observability::tracing_setup::init_tracing;

const CONFIG_ENV: &str = "RELAY_CONFIG";
const DEFAULT_CONFIG: &str = "relay.toml";

fn config_path() -> PathBuf {
    env::args()
        .nth(1)
        .or_else(|| env::var(CONFIG_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let path = config_path();
    let config = RelayConfig::load(&path)?;
    tracing::info!(config = %path.display(), site = %config.site.id, "starting relay");
    relay_runtime::run(config).await
}
