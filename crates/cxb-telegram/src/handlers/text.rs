use std::sync::Arc;

use teloxide::prelude::*;

use cxb_core::domain::ChatId;

use crate::handlers::{send, FOR_REGISTERED_USERS};
use crate::router::AppState;

const BUTTON_ACTIVATE: &str = "Activate Updates 🚀";
const BUTTON_DEACTIVATE: &str = "Deactivate updates";
const BUTTON_MANUAL: &str = "Bot Manual 📗";

fn manual_html() -> String {
    "<i>Click <b>Activate Updates</b> to activate daily updates</i>\n\n\
     <i>Click <b>Deactivate Updates</b> to deactivate updates</i>\n\n\
     <i>Click <b>Bot Manual</b> to learn how to use the bot</i>\n\n\
     <i>To find the exchange rate between a base currency and multiple target currencies, \
     use the command below:</i>\n\n\
     /multipleExchange\n\
     USD/CAD/EUR\n\n\
     Put your base currency first and other currencies should follow. Separate them with a \
     forward slash(/)\n\n\
     <i>To find the exchange rate between a base currency and a single target currency, \
     use the command below:</i>\n\n\
     /singleExchange\n\
     USD/GBP\n\n\
     Put your base currency first and the target currency should follow. Separate them with a \
     forward slash(/).\n\n\
     <i>To find the exchange rate between a base currency and a single target currency with a \
     base amount, use the command below:</i>\n\n\
     /exchangeRate\n\
     USD/CAD @ 50\n\n\
     Put your base and target currency together and signify the base amount with the @ symbol"
        .to_string()
}

/// Free-text messages: the persistent menu buttons, plus a fallback for
/// anything else.
pub async fn handle_text(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    let registered = match state.flow.registered_user(chat_id).await {
        Ok(user) => user.is_some(),
        Err(e) => {
            tracing::error!("store lookup for chat {} failed: {e}", chat_id.0);
            send(&state, chat_id, "Error occurred! Please try again later.").await;
            return Ok(());
        }
    };
    if !registered {
        send(&state, chat_id, FOR_REGISTERED_USERS).await;
        return Ok(());
    }

    match text {
        BUTTON_MANUAL => send(&state, chat_id, &manual_html()).await,

        BUTTON_ACTIVATE => match state.store.set_receive_updates(chat_id, true).await {
            Ok(()) => {
                send(
                    &state,
                    chat_id,
                    "<i>You have successfully activated daily exchange rate updates</i>",
                )
                .await;
            }
            Err(e) => {
                tracing::error!("activating updates for chat {} failed: {e}", chat_id.0);
                send(&state, chat_id, "Error occurred! Please try again later.").await;
            }
        },

        BUTTON_DEACTIVATE => match state.store.set_receive_updates(chat_id, false).await {
            Ok(()) => {
                send(
                    &state,
                    chat_id,
                    "<i>You have successfully deactivated daily exchange rate updates</i>",
                )
                .await;
            }
            Err(e) => {
                tracing::error!("deactivating updates for chat {} failed: {e}", chat_id.0);
                send(&state, chat_id, "Error occurred! Please try again later.").await;
            }
        },

        _ => {
            send(
                &state,
                chat_id,
                "<i>This bot is not able to respond to your messages for now</i>",
            )
            .await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_documents_every_exchange_command() {
        let manual = manual_html();
        assert!(manual.contains("/multipleExchange"));
        assert!(manual.contains("/singleExchange"));
        assert!(manual.contains("/exchangeRate"));
    }
}
