//! Daily digest job.
//!
//! Once per day at the configured wall-clock time, fetches live rates for
//! every subscribed user and sends each a digest of their chosen targets.
//! Sends are serialized with a fixed delay so a large user list cannot flood
//! the outbound channel.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    config::DigestTime,
    exchange::render_digest,
    messaging::port::MessengerPort,
    rates::{LiveRates, RateClient},
    store::UserStore,
    Result,
};

/// Job-scoped cache of live-rate responses keyed by base currency.
///
/// Lives for a single run and is dropped with it; users sharing a base
/// currency share one upstream call.
#[derive(Default)]
pub struct RateCache {
    by_base: HashMap<String, LiveRates>,
}

impl RateCache {
    pub fn get(&self, base: &str) -> Option<&LiveRates> {
        self.by_base.get(base)
    }

    pub fn insert(&mut self, base: String, rates: LiveRates) {
        self.by_base.insert(base, rates);
    }

    pub fn len(&self) -> usize {
        self.by_base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_base.is_empty()
    }
}

/// Outcome of one digest run, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigestRunReport {
    pub subscribers: usize,
    pub sent: usize,
    pub skipped: usize,
}

pub struct DigestScheduler {
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

struct Inner {
    time: DigestTime,
    send_delay: Duration,
    store: Arc<dyn UserStore>,
    rates: Arc<dyn RateClient>,
    messenger: Arc<dyn MessengerPort>,
}

impl DigestScheduler {
    pub fn new(
        time: DigestTime,
        send_delay: Duration,
        store: Arc<dyn UserStore>,
        rates: Arc<dyn RateClient>,
        messenger: Arc<dyn MessengerPort>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                time,
                send_delay,
                store,
                rates,
                messenger,
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the daily job loop. Call `stop` to cancel it.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tracing::info!(
                "digest job scheduled daily at {:02}:{:02}",
                inner.time.hour,
                inner.time.minute
            );
            loop {
                let Some(next) = next_run_after(Local::now(), inner.time) else {
                    tracing::error!("digest job has no next run, stopping");
                    break;
                };
                let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(wait) => {
                        match run_once(&inner).await {
                            Ok(report) => tracing::info!(
                                "digest run done: {} subscribers, {} sent, {} skipped",
                                report.subscribers, report.sent, report.skipped
                            ),
                            Err(e) => tracing::error!("digest run failed: {e}"),
                        }
                    }
                }
            }
        })
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// One full digest pass; exposed for tests and manual triggering.
    pub async fn run_once(&self) -> Result<DigestRunReport> {
        run_once(&self.inner).await
    }
}

async fn run_once(inner: &Inner) -> Result<DigestRunReport> {
    let users = inner.store.subscribed().await?;
    let mut report = DigestRunReport {
        subscribers: users.len(),
        ..DigestRunReport::default()
    };

    let mut cache = RateCache::default();

    for (idx, user) in users.iter().enumerate() {
        let base = user.base_currency.to_uppercase();

        if cache.get(&base).is_none() {
            match inner.rates.live_rates(&base, &[]).await {
                Ok(rates) => cache.insert(base.clone(), rates),
                Err(e) => {
                    tracing::warn!("live rates for {base} failed, skipping chat {}: {e}", user.chat_id.0);
                    report.skipped += 1;
                    continue;
                }
            }
        }
        let Some(rates) = cache.get(&base) else {
            continue;
        };

        match render_digest(&base, &user.targets(), rates) {
            Ok(body) => match inner.messenger.send_html(user.chat_id, &body).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    tracing::warn!("digest send to chat {} failed: {e}", user.chat_id.0);
                    report.skipped += 1;
                }
            },
            Err(e) => {
                tracing::warn!("digest for chat {} not rendered: {e}", user.chat_id.0);
                report.skipped += 1;
            }
        }

        if idx + 1 < users.len() {
            sleep(inner.send_delay).await;
        }
    }

    Ok(report)
}

/// Next local occurrence of `at` strictly after `now`.
///
/// Skips forward over days where the wall-clock time does not exist (DST gap).
fn next_run_after(now: DateTime<Local>, at: DigestTime) -> Option<DateTime<Local>> {
    let mut day = now.date_naive();
    for _ in 0..3 {
        if let Some(naive) = day.and_hms_opt(at.hour, at.minute, 0) {
            if let Some(dt) = naive.and_local_timezone(Local).earliest() {
                if dt > now {
                    return Some(dt);
                }
            }
        }
        day = day.succ_opt()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::ChatId;
    use crate::messaging::port::testing::RecordingMessenger;
    use crate::rates::testing::ScriptedRateClient;
    use crate::store::testing::MemoryUserStore;
    use crate::store::User;

    fn user(chat: i64, base: &str, pairs: &str, subscribed: bool) -> User {
        User {
            id: chat,
            chat_id: ChatId(chat),
            base_currency: base.to_string(),
            currency_pairs: pairs.to_string(),
            receive_updates: subscribed,
        }
    }

    fn rates() -> HashMap<String, HashMap<String, f64>> {
        let mut usd = HashMap::new();
        usd.insert("CAD".to_string(), 1.35);
        usd.insert("EUR".to_string(), 0.92);
        let mut gbp = HashMap::new();
        gbp.insert("USD".to_string(), 1.27);

        let mut tables = HashMap::new();
        tables.insert("USD".to_string(), usd);
        tables.insert("GBP".to_string(), gbp);
        tables
    }

    fn scheduler(
        users: Vec<User>,
    ) -> (
        DigestScheduler,
        Arc<ScriptedRateClient>,
        Arc<RecordingMessenger>,
    ) {
        let store = Arc::new(MemoryUserStore::with_users(users));
        let client = Arc::new(ScriptedRateClient::new(rates()));
        let messenger = Arc::new(RecordingMessenger::new());
        let scheduler = DigestScheduler::new(
            DigestTime { hour: 7, minute: 0 },
            Duration::from_secs(2),
            store,
            client.clone(),
            messenger.clone(),
        );
        (scheduler, client, messenger)
    }

    #[tokio::test(start_paused = true)]
    async fn sends_one_message_per_subscribed_user_only() {
        let (scheduler, _, messenger) = scheduler(vec![
            user(1, "USD", "CAD,EUR", true),
            user(2, "USD", "CAD", false),
            user(3, "GBP", "USD", true),
        ]);

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(messenger.sent_to(ChatId(1)).len(), 1);
        assert!(messenger.sent_to(ChatId(2)).is_empty());
        assert_eq!(messenger.sent_to(ChatId(3)).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn users_sharing_a_base_share_one_upstream_call() {
        let (scheduler, client, _) = scheduler(vec![
            user(1, "USD", "CAD", true),
            user(2, "USD", "EUR", true),
            user(3, "GBP", "USD", true),
        ]);

        scheduler.run_once().await.unwrap();
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_body_lists_the_users_targets() {
        let (scheduler, _, messenger) = scheduler(vec![user(1, "USD", "CAD,EUR", true)]);

        scheduler.run_once().await.unwrap();
        let sent = messenger.sent_to(ChatId(1));
        assert!(sent[0].contains("relative to USD"));
        assert!(sent[0].contains("<b>CAD</b>: 1.35"));
        assert!(sent[0].contains("<b>EUR</b>: 0.92"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_base_skips_that_user_and_continues() {
        let (scheduler, _, messenger) = scheduler(vec![
            user(1, "ZAR", "USD", true),
            user(2, "USD", "CAD", true),
        ]);

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 1);
        assert!(messenger.sent_to(ChatId(1)).is_empty());
        assert_eq!(messenger.sent_to(ChatId(2)).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn target_missing_from_response_skips_that_user() {
        let (scheduler, _, messenger) = scheduler(vec![
            user(1, "USD", "CAD,JPY", true),
            user(2, "USD", "EUR", true),
        ]);

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.skipped, 1);
        assert!(messenger.sent_to(ChatId(1)).is_empty());
        assert_eq!(messenger.sent_to(ChatId(2)).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_subscriber_list_sends_nothing() {
        let (scheduler, client, messenger) = scheduler(vec![user(1, "USD", "CAD", false)]);

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report, DigestRunReport::default());
        assert_eq!(client.call_count(), 0);
        assert_eq!(messenger.sent_count(), 0);
    }

    #[test]
    fn next_run_is_today_when_time_not_yet_reached() {
        let now = Local.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap();
        let next = next_run_after(now, DigestTime { hour: 7, minute: 0 }).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap());
    }

    #[test]
    fn next_run_is_tomorrow_when_time_already_passed() {
        let now = Local.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap();
        let next = next_run_after(now, DigestTime { hour: 7, minute: 0 }).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2026, 3, 3, 7, 0, 0).unwrap());
    }
}
