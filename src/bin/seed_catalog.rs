// src/bin/seed_catalog.rs

use medspa_scheduler::config::Config;
use medspa_scheduler::{SpaStore, StoreOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let backend = cfg.open_backend().await?;
    let store = SpaStore::open(
        backend,
        StoreOptions {
            seed_default_catalog: false,
            ..StoreOptions::from(&cfg)
        },
    )
    .await?;

    if store.seed_default_catalog().await? {
        tracing::info!(
            services = store.services(None).await.len(),
            staff = store.staff(None).await.len(),
            "default catalog written"
        );
    } else {
        tracing::info!("catalog already present, nothing to do");
    }
    Ok(())
}
