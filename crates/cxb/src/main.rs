use std::sync::Arc;

use cxb_core::{config::Config, rates::RateClient, store::UserStore};
use cxb_rates::AbstractRateClient;
use cxb_store::SqliteUserStore;

#[tokio::main]
async fn main() -> Result<(), cxb_core::Error> {
    cxb_core::logging::init("cxb");

    let cfg = Arc::new(Config::load()?);

    let store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::connect(&cfg.database_url).await?);

    let rates: Arc<dyn RateClient> = Arc::new(AbstractRateClient::new(
        cfg.exchange_api_key.clone(),
        cfg.exchange_api_base_url.clone(),
        cfg.upstream_timeout,
    )?);

    cxb_telegram::router::run_polling(cfg, store, rates)
        .await
        .map_err(|e| cxb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
