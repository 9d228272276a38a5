//! SQLite adapter for the user store.
//!
//! One `users` table, schema created at connect time. SQL lives here; the
//! core crate only sees the `UserStore` port.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use cxb_core::{
    domain::ChatId,
    errors::Error,
    store::{NewUser, User, UserStore},
    Result,
};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL UNIQUE,
    base_currency TEXT NOT NULL,
    currency_pairs TEXT NOT NULL,
    receive_updates INTEGER NOT NULL DEFAULT 0
)";

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    chat_id: i64,
    base_currency: String,
    currency_pairs: String,
    receive_updates: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            chat_id: ChatId(row.chat_id),
            base_currency: row.base_currency,
            currency_pairs: row.currency_pairs,
            receive_updates: row.receive_updates,
        }
    }
}

impl SqliteUserStore {
    /// Opens (or creates) the database and ensures the schema exists.
    ///
    /// A single-connection pool: traffic is low, dispatch is serialized, and
    /// one writer sidesteps SQLite lock contention entirely.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(store_err)?;

        sqlx::query(SCHEMA).execute(&pool).await.map_err(store_err)?;

        Ok(Self { pool })
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_chat(&self, chat_id: ChatId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, chat_id, base_currency, currency_pairs, receive_updates \
             FROM users WHERE chat_id = ?",
        )
        .bind(chat_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(User::from))
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let res = sqlx::query(
            "INSERT INTO users (chat_id, base_currency, currency_pairs, receive_updates) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user.chat_id.0)
        .bind(&user.base_currency)
        .bind(&user.currency_pairs)
        .bind(user.receive_updates)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(User {
            id: res.last_insert_rowid(),
            chat_id: user.chat_id,
            base_currency: user.base_currency,
            currency_pairs: user.currency_pairs,
            receive_updates: user.receive_updates,
        })
    }

    async fn set_receive_updates(&self, chat_id: ChatId, receive: bool) -> Result<()> {
        let res = sqlx::query("UPDATE users SET receive_updates = ? WHERE chat_id = ?")
            .bind(receive)
            .bind(chat_id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if res.rows_affected() == 0 {
            return Err(Error::Store(format!("chat {} not registered", chat_id.0)));
        }
        Ok(())
    }

    async fn subscribed(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, chat_id, base_currency, currency_pairs, receive_updates \
             FROM users WHERE receive_updates = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteUserStore {
        SqliteUserStore::connect("sqlite::memory:").await.unwrap()
    }

    fn new_user(chat: i64, subscribed: bool) -> NewUser {
        NewUser {
            chat_id: ChatId(chat),
            base_currency: "USD".to_string(),
            currency_pairs: "CAD,EUR".to_string(),
            receive_updates: subscribed,
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let store = store().await;

        assert!(store.find_by_chat(ChatId(1)).await.unwrap().is_none());

        let inserted = store.insert(new_user(1, true)).await.unwrap();
        let found = store.find_by_chat(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(found, inserted);
        assert_eq!(found.base_currency, "USD");
        assert_eq!(found.targets(), vec!["CAD", "EUR"]);
        assert!(found.receive_updates);
    }

    #[tokio::test]
    async fn one_row_per_chat() {
        let store = store().await;
        store.insert(new_user(1, false)).await.unwrap();
        assert!(store.insert(new_user(1, true)).await.is_err());
    }

    #[tokio::test]
    async fn flag_flip_persists() {
        let store = store().await;
        store.insert(new_user(1, false)).await.unwrap();

        store.set_receive_updates(ChatId(1), true).await.unwrap();
        assert!(
            store
                .find_by_chat(ChatId(1))
                .await
                .unwrap()
                .unwrap()
                .receive_updates
        );

        store.set_receive_updates(ChatId(1), false).await.unwrap();
        assert!(
            !store
                .find_by_chat(ChatId(1))
                .await
                .unwrap()
                .unwrap()
                .receive_updates
        );
    }

    #[tokio::test]
    async fn flag_flip_requires_a_registered_chat() {
        let store = store().await;
        assert!(store.set_receive_updates(ChatId(42), true).await.is_err());
    }

    #[tokio::test]
    async fn subscribed_returns_only_flagged_users() {
        let store = store().await;
        store.insert(new_user(1, true)).await.unwrap();
        store.insert(new_user(2, false)).await.unwrap();
        store.insert(new_user(3, true)).await.unwrap();

        let subs = store.subscribed().await.unwrap();
        let chats: Vec<i64> = subs.iter().map(|u| u.chat_id.0).collect();
        assert_eq!(chats, vec![1, 3]);
    }
}
