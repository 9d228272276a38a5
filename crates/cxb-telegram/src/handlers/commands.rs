use std::sync::Arc;

use teloxide::prelude::*;

use cxb_core::{
    domain::ChatId,
    exchange::{
        escape_html, parse_amount_pair, parse_multi, parse_pair, render_conversion,
        render_multi_rates, render_single_rate,
    },
    messaging::types::InlineKeyboard,
    registration::StepError,
    Error, Result,
};

use crate::handlers::{
    send, FOR_NEW_USERS, FOR_REGISTERED_USERS, RESTART_REGISTRATION, UPSTREAM_UNAVAILABLE,
};
use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    let (cmd, arg) = parse_command(text);

    let result = match cmd.as_str() {
        "start" => start(&state, chat_id).await,
        "basecurrency" => base_currency(&state, chat_id, &arg).await,
        "targetcurrencies" => target_currencies(&state, chat_id, &arg).await,
        "singleexchange" => single_exchange(&state, chat_id, &arg).await,
        "multipleexchange" => multiple_exchange(&state, chat_id, &arg).await,
        "exchangerate" => arbitrary_exchange(&state, chat_id, &arg).await,
        _ => {
            send(
                &state,
                chat_id,
                "Unknown command. See the Bot Manual 📗 for usage.",
            )
            .await;
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("command /{cmd} in chat {} failed: {e}", chat_id.0);
        send(&state, chat_id, "Error occurred! Please try again later.").await;
    }

    Ok(())
}

async fn start(state: &AppState, chat_id: ChatId) -> Result<()> {
    if state.flow.registered_user(chat_id).await?.is_some() {
        send(state, chat_id, FOR_NEW_USERS).await;
        return Ok(());
    }

    send(
        state,
        chat_id,
        "Welcome to the currency exchange bot.\n\n\
         What is your base currency? Use the example below as a guide:\n\n\
         /baseCurrency\n\
         your base currency, e.g USD, GBP, CAD, etc.\n",
    )
    .await;
    Ok(())
}

async fn base_currency(state: &AppState, chat_id: ChatId, arg: &str) -> Result<()> {
    match state.flow.submit_base(chat_id, arg).await {
        Ok(_) => {
            send(
                state,
                chat_id,
                "Kindly list your favorite target currencies. That is, a list of currencies \
                 you want to convert your base currency to. You can select as many as you want\n\
                 <b>Each currency should be separated by a comma(,)</b>\n\n\
                 Use the example below as a guide:\n\n\
                 /targetCurrencies\n\
                 USD,CAD,GBP",
            )
            .await;
        }
        Err(StepError::AlreadyRegistered) => send(state, chat_id, FOR_NEW_USERS).await,
        Err(StepError::UnsupportedCurrency(code)) => {
            // `code` is raw user input; escape it before echoing into HTML.
            send(
                state,
                chat_id,
                &format!("This bot does not support {} currency", escape_html(&code)),
            )
            .await;
        }
        Err(StepError::OutOfOrder) => send(state, chat_id, RESTART_REGISTRATION).await,
        Err(StepError::Store(e)) => return Err(e),
    }
    Ok(())
}

async fn target_currencies(state: &AppState, chat_id: ChatId, arg: &str) -> Result<()> {
    match state.flow.submit_targets(chat_id, arg).await {
        Ok(_) => {
            let prompt = "<b>Would you like to receive daily updates on selected currencies?</b>";
            if let Err(e) = state
                .messenger
                .send_inline_keyboard(chat_id, prompt, InlineKeyboard::yes_no())
                .await
            {
                tracing::warn!("yes/no keyboard to chat {} failed: {e}", chat_id.0);
            }
        }
        Err(StepError::AlreadyRegistered) => send(state, chat_id, FOR_NEW_USERS).await,
        Err(StepError::UnsupportedCurrency(_)) => {
            send(
                state,
                chat_id,
                "Error occurred! Ensure that each currency is supported by the bot.",
            )
            .await;
        }
        Err(StepError::OutOfOrder) => send(state, chat_id, RESTART_REGISTRATION).await,
        Err(StepError::Store(e)) => return Err(e),
    }
    Ok(())
}

async fn single_exchange(state: &AppState, chat_id: ChatId, arg: &str) -> Result<()> {
    if state.flow.registered_user(chat_id).await?.is_none() {
        send(state, chat_id, FOR_REGISTERED_USERS).await;
        return Ok(());
    }

    let (base, target) = match parse_pair(arg) {
        Ok(pair) => pair,
        Err(_) => {
            send(
                state,
                chat_id,
                "Error occurred! You must enter two currency codes separated by a forward slash(/)",
            )
            .await;
            return Ok(());
        }
    };

    if !state.catalog.is_valid(&base) || !state.catalog.is_valid(&target) {
        send(
            state,
            chat_id,
            "Error occurred! Ensure that both currencies are supported by the bot.",
        )
        .await;
        return Ok(());
    }

    match state.rates.convert(&base, &target, None).await {
        Ok(conversion) => {
            send(
                state,
                chat_id,
                &render_single_rate(&base, &target, conversion.exchange_rate),
            )
            .await;
        }
        Err(e) => {
            tracing::warn!("convert {base}/{target} failed: {e}");
            send(state, chat_id, UPSTREAM_UNAVAILABLE).await;
        }
    }
    Ok(())
}

async fn multiple_exchange(state: &AppState, chat_id: ChatId, arg: &str) -> Result<()> {
    if state.flow.registered_user(chat_id).await?.is_none() {
        send(state, chat_id, FOR_REGISTERED_USERS).await;
        return Ok(());
    }

    let (base, targets) = match parse_multi(arg) {
        Ok(parsed) => parsed,
        Err(_) => {
            send(
                state,
                chat_id,
                "Error occurred! Ensure that there are more than two currencies separated by a \
                 forward slash(/).",
            )
            .await;
            return Ok(());
        }
    };

    if !state.catalog.are_valid(&targets) {
        send(
            state,
            chat_id,
            "Error occurred! Ensure this bot supports the currencies you entered.",
        )
        .await;
        return Ok(());
    }

    match state.rates.live_rates(&base, &targets).await {
        Ok(rates) => match render_multi_rates(&targets, &rates) {
            Ok(body) => send(state, chat_id, &body).await,
            Err(e) => {
                tracing::warn!("live rates for {base} incomplete: {e}");
                send(state, chat_id, UPSTREAM_UNAVAILABLE).await;
            }
        },
        Err(e) => {
            tracing::warn!("live rates for {base} failed: {e}");
            send(state, chat_id, UPSTREAM_UNAVAILABLE).await;
        }
    }
    Ok(())
}

async fn arbitrary_exchange(state: &AppState, chat_id: ChatId, arg: &str) -> Result<()> {
    if state.flow.registered_user(chat_id).await?.is_none() {
        send(state, chat_id, FOR_REGISTERED_USERS).await;
        return Ok(());
    }

    let (base, target, amount) = match parse_amount_pair(arg) {
        Ok(parsed) => parsed,
        Err(Error::InvalidAmount(_)) => {
            send(state, chat_id, "Please enter a valid number").await;
            return Ok(());
        }
        Err(_) => {
            send(state, chat_id, "Please enter values in the correct format").await;
            return Ok(());
        }
    };

    if !state.catalog.is_valid(&base) || !state.catalog.is_valid(&target) {
        send(
            state,
            chat_id,
            "Error occurred! Ensure this bot supports the currencies you entered.",
        )
        .await;
        return Ok(());
    }

    match state.rates.convert(&base, &target, Some(amount)).await {
        Ok(conversion) => {
            let converted = conversion
                .converted_amount
                .unwrap_or(amount * conversion.exchange_rate);
            let body = render_conversion(
                &base,
                &target,
                conversion.exchange_rate,
                conversion.base_amount.unwrap_or(amount),
                converted,
            );
            send(state, chat_id, &body).await;
        }
        Err(e) => {
            tracing::warn!("convert {base}/{target}@{amount} failed: {e}");
            send(state, chat_id, UPSTREAM_UNAVAILABLE).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_splits_name_and_args() {
        assert_eq!(
            parse_command("/baseCurrency USD"),
            ("basecurrency".to_string(), "USD".to_string())
        );
        assert_eq!(
            parse_command("/singleExchange USD/CAD"),
            ("singleexchange".to_string(), "USD/CAD".to_string())
        );
    }

    #[test]
    fn parse_command_strips_bot_suffix() {
        assert_eq!(
            parse_command("/start@my_bot"),
            ("start".to_string(), String::new())
        );
    }

    #[test]
    fn parse_command_keeps_full_argument_tail() {
        assert_eq!(
            parse_command("/exchangeRate USD/CAD @ 50"),
            ("exchangerate".to_string(), "USD/CAD @ 50".to_string())
        );
    }
}
