use std::sync::Arc;

use teloxide::{prelude::*, types::CallbackQuery};

use cxb_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::ReplyKeyboard,
    registration::StepError,
};

use crate::handlers::{send, FOR_NEW_USERS, RESTART_REGISTRATION};
use crate::router::AppState;

/// The persistent menu sent once registration completes.
fn menu_keyboard() -> ReplyKeyboard {
    ReplyKeyboard {
        rows: vec![
            vec![
                "Activate Updates 🚀".to_string(),
                "Deactivate updates".to_string(),
            ],
            vec!["Bot Manual 📗".to_string()],
        ],
    }
}

/// Handles the yes/no selection that closes the registration flow.
pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let callback_id = q.id.clone();
    let data = q.data.clone().unwrap_or_default();
    let Some(message) = q.message.as_ref() else {
        answer(&state, &callback_id, None).await;
        return Ok(());
    };
    let chat_id = ChatId(message.chat.id.0);

    let receive_updates = match data.as_str() {
        "yes" => true,
        "no" => false,
        _ => {
            answer(&state, &callback_id, Some("Invalid selection")).await;
            return Ok(());
        }
    };

    match state.flow.confirm(chat_id, receive_updates).await {
        Ok(_) => {
            // Replace the keyboard message with the selection so the buttons
            // cannot be pressed twice.
            let keyboard_msg = MessageRef {
                chat_id,
                message_id: MessageId(message.id.0),
            };
            let choice = if receive_updates { "✓ Yes" } else { "✓ No" };
            if let Err(e) = state.messenger.edit_html(keyboard_msg, choice).await {
                tracing::warn!("edit of yes/no keyboard in chat {} failed: {e}", chat_id.0);
            }
            answer(&state, &callback_id, None).await;

            if let Err(e) = state
                .messenger
                .send_reply_keyboard(
                    chat_id,
                    "<b>You have successfully completed your registration</b>",
                    menu_keyboard(),
                )
                .await
            {
                tracing::warn!("menu keyboard to chat {} failed: {e}", chat_id.0);
            }
        }
        Err(StepError::AlreadyRegistered) => {
            answer(&state, &callback_id, None).await;
            send(&state, chat_id, FOR_NEW_USERS).await;
        }
        Err(StepError::OutOfOrder) => {
            answer(&state, &callback_id, None).await;
            send(&state, chat_id, RESTART_REGISTRATION).await;
        }
        Err(e) => {
            tracing::error!("registration confirm in chat {} failed: {e}", chat_id.0);
            answer(&state, &callback_id, None).await;
            send(&state, chat_id, "Error occurred! Please try again later.").await;
        }
    }

    Ok(())
}

async fn answer(state: &AppState, callback_id: &str, text: Option<&str>) {
    if let Err(e) = state.messenger.answer_callback_query(callback_id, text).await {
        tracing::warn!("answer_callback_query failed: {e}");
    }
}
