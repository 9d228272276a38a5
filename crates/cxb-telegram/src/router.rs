use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use cxb_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use cxb_core::{
    catalog::CurrencyCatalog, config::Config, digest::DigestScheduler,
    messaging::port::MessengerPort, rates::RateClient, registration::RegistrationFlow,
    store::UserStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub catalog: CurrencyCatalog,
    pub flow: Arc<RegistrationFlow>,
    pub store: Arc<dyn UserStore>,
    pub rates: Arc<dyn RateClient>,
    pub messenger: Arc<dyn MessengerPort>,
    pub digest: Arc<DigestScheduler>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<dyn UserStore>,
    rates: Arc<dyn RateClient>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!("cxb started: @{}", me.username());
    }

    // Wrap the raw Telegram messenger with a throttling decorator so the
    // digest fan-out and busy chats stay under Telegram flood limits.
    let raw_messenger: Arc<dyn MessengerPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessengerPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let catalog = CurrencyCatalog::new();
    let flow = Arc::new(RegistrationFlow::new(store.clone(), catalog));

    let digest = Arc::new(DigestScheduler::new(
        cfg.digest_time,
        cfg.digest_send_delay,
        store.clone(),
        rates.clone(),
        messenger.clone(),
    ));
    digest.start();

    let state = Arc::new(AppState {
        cfg,
        catalog,
        flow,
        store,
        rates,
        messenger,
        digest: digest.clone(),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    digest.stop();

    Ok(())
}
