//! Telegram update handlers.
//!
//! Each handler guards on the chat's registration status first (explicit
//! calls, no decorator magic), then parses, validates, and finally talks to
//! the upstream API — so bad input never costs an upstream call. Every error
//! is converted into a user-facing message here; nothing propagates to the
//! dispatcher.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use cxb_core::domain::ChatId;

use crate::router::AppState;

mod callback;
mod commands;
mod text;

/// Guard message for registration steps attempted by a registered chat.
pub(crate) const FOR_NEW_USERS: &str = "This endpoint is for new and unregistered users.";

/// Guard message for query commands and menu buttons from an unknown chat.
pub(crate) const FOR_REGISTERED_USERS: &str = "This endpoint is for registered users.";

/// Re-prompt used when a registration step arrives out of order.
pub(crate) const RESTART_REGISTRATION: &str =
    "<b>There's an error with your registration. Kindly restart by submitting your base currency</b>\n\
     Use the example below as a guide:\n\n\
     /baseCurrency\n\
     your base currency, e.g USD, GBP\n";

/// Shown when the upstream rate API fails or returns something unusable.
pub(crate) const UPSTREAM_UNAVAILABLE: &str =
    "Error occurred! The exchange rate service is unavailable right now. Try again later.";

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(message_text) = msg.text() else {
        // Photos, stickers, voice — nothing this bot handles.
        return Ok(());
    };

    if message_text.starts_with('/') {
        return commands::handle_command(msg, state).await;
    }
    text::handle_text(msg, state).await
}

/// Send, logging instead of failing the handler on transport errors.
pub(crate) async fn send(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!("send to chat {} failed: {e}", chat_id.0);
    }
}
