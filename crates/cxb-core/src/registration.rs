//! Conversational registration flow.
//!
//! One state machine per chat: NEW → HAS_BASE → HAS_TARGETS → REGISTERED.
//! Pending values live in an explicit in-memory session registry owned by the
//! flow; nothing is persisted until `confirm` completes the final step, so an
//! interrupted registration never leaves a partial row behind.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    catalog::CurrencyCatalog,
    domain::ChatId,
    store::{NewUser, User, UserStore},
};

/// Where a chat currently is in the registration conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStatus {
    New,
    HasBase,
    HasTargets,
    Registered,
}

/// Why a registration step was rejected. The Telegram layer turns each case
/// into the matching user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("chat is already registered")]
    AlreadyRegistered,

    #[error("step invoked out of order")]
    OutOfOrder,

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error(transparent)]
    Store(#[from] crate::Error),
}

#[derive(Clone, Debug, Default)]
struct PendingRegistration {
    base_currency: Option<String>,
    target_currencies: Option<Vec<String>>,
}

/// The registration state machine for all chats.
///
/// REGISTERED is derived from the persistent store; only the two intermediate
/// steps are held in the session registry.
pub struct RegistrationFlow {
    store: Arc<dyn UserStore>,
    catalog: CurrencyCatalog,
    sessions: Mutex<HashMap<i64, PendingRegistration>>,
}

impl RegistrationFlow {
    pub fn new(store: Arc<dyn UserStore>, catalog: CurrencyCatalog) -> Self {
        Self {
            store,
            catalog,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn status(&self, chat_id: ChatId) -> crate::Result<RegistrationStatus> {
        if self.store.find_by_chat(chat_id).await?.is_some() {
            return Ok(RegistrationStatus::Registered);
        }
        let sessions = self.sessions.lock().await;
        Ok(match sessions.get(&chat_id.0) {
            Some(p) if p.target_currencies.is_some() => RegistrationStatus::HasTargets,
            Some(p) if p.base_currency.is_some() => RegistrationStatus::HasBase,
            _ => RegistrationStatus::New,
        })
    }

    /// The stored user row, if this chat completed registration.
    pub async fn registered_user(&self, chat_id: ChatId) -> crate::Result<Option<User>> {
        self.store.find_by_chat(chat_id).await
    }

    /// NEW → HAS_BASE. Returns the normalized base currency code.
    pub async fn submit_base(
        &self,
        chat_id: ChatId,
        input: &str,
    ) -> std::result::Result<String, StepError> {
        self.reject_registered(chat_id).await?;

        let code = input.trim().to_uppercase();
        if !self.catalog.is_valid(&code) {
            return Err(StepError::UnsupportedCurrency(code));
        }

        let mut sessions = self.sessions.lock().await;
        let pending = sessions.entry(chat_id.0).or_default();
        pending.base_currency = Some(code.clone());
        // Re-submitting the base restarts the conversation.
        pending.target_currencies = None;
        Ok(code)
    }

    /// HAS_BASE → HAS_TARGETS. Takes the comma-separated target list and
    /// returns the normalized codes in input order.
    pub async fn submit_targets(
        &self,
        chat_id: ChatId,
        input: &str,
    ) -> std::result::Result<Vec<String>, StepError> {
        self.reject_registered(chat_id).await?;

        let targets: Vec<String> = input
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if targets.is_empty() || !self.catalog.are_valid(&targets) {
            return Err(StepError::UnsupportedCurrency(input.trim().to_string()));
        }

        let mut sessions = self.sessions.lock().await;
        let pending = sessions
            .get_mut(&chat_id.0)
            .filter(|p| p.base_currency.is_some())
            .ok_or(StepError::OutOfOrder)?;
        pending.target_currencies = Some(targets.clone());
        Ok(targets)
    }

    /// HAS_TARGETS → REGISTERED. Persists the user row with the chosen
    /// updates flag and drops the pending session.
    pub async fn confirm(
        &self,
        chat_id: ChatId,
        receive_updates: bool,
    ) -> std::result::Result<User, StepError> {
        self.reject_registered(chat_id).await?;

        let pending = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get(&chat_id.0) {
                Some(p) if p.base_currency.is_some() && p.target_currencies.is_some() => {
                    sessions.remove(&chat_id.0).unwrap_or_default()
                }
                _ => return Err(StepError::OutOfOrder),
            }
        };

        let base_currency = pending.base_currency.unwrap_or_default();
        let currency_pairs = pending.target_currencies.unwrap_or_default().join(",");

        let user = self
            .store
            .insert(NewUser {
                chat_id,
                base_currency,
                currency_pairs,
                receive_updates,
            })
            .await?;
        Ok(user)
    }

    async fn reject_registered(&self, chat_id: ChatId) -> std::result::Result<(), StepError> {
        if self.store.find_by_chat(chat_id).await?.is_some() {
            return Err(StepError::AlreadyRegistered);
        }
        Ok(())
    }
}
