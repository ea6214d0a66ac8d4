use anyhow::Context;
use capstone_config::CapstoneConfig;
use capstone_db::service::CapstoneService;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: CapstoneService,
    pub config: CapstoneConfig,
}

impl AppContext {
    pub async fn init(config: CapstoneConfig) -> anyhow::Result<Self> {
        let service = CapstoneService::open(&config)
            .await
            .with_context(|| format!("database at {}", config.database.path))?;
        Ok(Self { service, config })
    }
}

/// Load layered config, then apply command-line overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<CapstoneConfig> {
    let mut config = CapstoneConfig::load_with_dotenv().context("failed to load configuration")?;
    if let Some(db) = &flags.db {
        config.database.path.clone_from(db);
    }
    tracing::debug!(database = %config.database.path, "configuration loaded");
    Ok(config)
}
