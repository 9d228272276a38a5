//! Core domain + application logic for the currency exchange bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / the upstream
//! rate API / the user database live behind ports (traits) implemented in
//! adapter crates.

pub mod catalog;
pub mod config;
pub mod digest;
pub mod domain;
pub mod errors;
pub mod exchange;
pub mod logging;
pub mod messaging;
pub mod rates;
pub mod registration;
pub mod store;

pub use errors::{Error, Result};
