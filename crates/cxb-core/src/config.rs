use std::{env, time::Duration};

use crate::{errors::Error, Result};

const DEFAULT_API_BASE_URL: &str = "https://exchange-rates.abstractapi.com";
const DEFAULT_DATABASE_URL: &str = "sqlite://cxb.sqlite?mode=rwc";

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub exchange_api_key: String,
    pub exchange_api_base_url: String,
    pub database_url: String,

    // Daily digest
    pub digest_time: DigestTime,
    pub digest_send_delay: Duration,

    // Upstream HTTP
    pub upstream_timeout: Duration,
}

/// Local wall-clock time at which the daily digest fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigestTime {
    pub hour: u32,
    pub minute: u32,
}

impl DigestTime {
    /// Parses `HH:MM` (24h).
    pub fn parse(s: &str) -> Result<Self> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("invalid digest time: {s}")))?;
        let hour: u32 = h
            .parse()
            .map_err(|_| Error::Config(format!("invalid digest hour: {h}")))?;
        let minute: u32 = m
            .parse()
            .map_err(|_| Error::Config(format!("invalid digest minute: {m}")))?;
        if hour > 23 || minute > 59 {
            return Err(Error::Config(format!("digest time out of range: {s}")));
        }
        Ok(Self { hour, minute })
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Populate the environment from .env if present; existing vars win.
        let _ = dotenvy::dotenv();

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let exchange_api_key = env_str("EXCHANGE_API_KEY").unwrap_or_default();
        if exchange_api_key.trim().is_empty() {
            return Err(Error::Config(
                "EXCHANGE_API_KEY environment variable is required".to_string(),
            ));
        }

        let exchange_api_base_url = env_str("EXCHANGE_API_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let database_url = env_str("DATABASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let digest_time = DigestTime::parse(
            &env_str("DIGEST_TIME")
                .and_then(non_empty)
                .unwrap_or_else(|| "07:00".to_string()),
        )?;
        let digest_send_delay =
            Duration::from_millis(env_u64("DIGEST_SEND_DELAY_MS").unwrap_or(2000));

        let upstream_timeout =
            Duration::from_millis(env_u64("UPSTREAM_TIMEOUT_MS").unwrap_or(10_000));

        Ok(Self {
            telegram_bot_token,
            exchange_api_key,
            exchange_api_base_url,
            database_url,
            digest_time,
            digest_send_delay,
            upstream_timeout,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_time_parses_hh_mm() {
        let t = DigestTime::parse("07:00").unwrap();
        assert_eq!(t, DigestTime { hour: 7, minute: 0 });

        let t = DigestTime::parse("23:59").unwrap();
        assert_eq!(
            t,
            DigestTime {
                hour: 23,
                minute: 59
            }
        );
    }

    #[test]
    fn digest_time_rejects_garbage() {
        assert!(DigestTime::parse("0700").is_err());
        assert!(DigestTime::parse("24:00").is_err());
        assert!(DigestTime::parse("12:60").is_err());
        assert!(DigestTime::parse("ab:cd").is_err());
    }
}
