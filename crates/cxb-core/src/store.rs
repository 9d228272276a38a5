//! User persistence port.
//!
//! One row per chat. The row is only ever created at the end of the
//! registration flow and only ever mutated to flip the updates flag.

use async_trait::async_trait;

use crate::{domain::ChatId, Result};

/// A registered user, as stored.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub chat_id: ChatId,
    pub base_currency: String,
    /// Comma-joined target currency codes, in the order the user chose them.
    pub currency_pairs: String,
    pub receive_updates: bool,
}

impl User {
    /// The stored target list, split back into codes.
    pub fn targets(&self) -> Vec<String> {
        self.currency_pairs
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Insert payload for a newly registered user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub chat_id: ChatId,
    pub base_currency: String,
    pub currency_pairs: String,
    pub receive_updates: bool,
}

/// Hexagonal port for the user table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_chat(&self, chat_id: ChatId) -> Result<Option<User>>;

    /// Inserts the row created at the end of registration. Fails if the chat
    /// already has a row.
    async fn insert(&self, user: NewUser) -> Result<User>;

    /// Flips the daily-updates flag for an existing user.
    async fn set_receive_updates(&self, chat_id: ChatId, receive: bool) -> Result<()>;

    /// All users with the daily-updates flag set.
    async fn subscribed(&self) -> Result<Vec<User>>;
}

#[cfg(test)]
pub mod testing {
    //! In-memory store double for flow and digest tests.

    use std::sync::Mutex;

    use super::*;
    use crate::Error;

    #[derive(Default)]
    pub struct MemoryUserStore {
        rows: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_users(users: Vec<User>) -> Self {
            Self {
                rows: Mutex::new(users),
            }
        }

        pub fn row_count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_chat(&self, chat_id: ChatId) -> Result<Option<User>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|u| u.chat_id == chat_id).cloned())
        }

        async fn insert(&self, user: NewUser) -> Result<User> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|u| u.chat_id == user.chat_id) {
                return Err(Error::Store(format!(
                    "chat {} already registered",
                    user.chat_id.0
                )));
            }
            let stored = User {
                id: rows.len() as i64 + 1,
                chat_id: user.chat_id,
                base_currency: user.base_currency,
                currency_pairs: user.currency_pairs,
                receive_updates: user.receive_updates,
            };
            rows.push(stored.clone());
            Ok(stored)
        }

        async fn set_receive_updates(&self, chat_id: ChatId, receive: bool) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let user = rows
                .iter_mut()
                .find(|u| u.chat_id == chat_id)
                .ok_or_else(|| Error::Store(format!("chat {} not registered", chat_id.0)))?;
            user.receive_updates = receive;
            Ok(())
        }

        async fn subscribed(&self) -> Result<Vec<User>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().filter(|u| u.receive_updates).cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_splits_stored_pairs_in_order() {
        let user = User {
            id: 1,
            chat_id: ChatId(7),
            base_currency: "USD".to_string(),
            currency_pairs: "CAD,EUR,GBP".to_string(),
            receive_updates: true,
        };
        assert_eq!(user.targets(), vec!["CAD", "EUR", "GBP"]);
    }

    #[test]
    fn targets_tolerates_stray_whitespace() {
        let user = User {
            id: 1,
            chat_id: ChatId(7),
            base_currency: "USD".to_string(),
            currency_pairs: " CAD , EUR ".to_string(),
            receive_updates: false,
        };
        assert_eq!(user.targets(), vec!["CAD", "EUR"]);
    }
}
