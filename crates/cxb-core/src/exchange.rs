//! Command-argument parsing and message rendering for exchange queries.
//!
//! Parsing normalizes user input (uppercase, trimmed) but does not validate
//! codes against the catalog; handlers do that so format errors and
//! unsupported-currency errors stay distinct.

use crate::{rates::LiveRates, Error, Result};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Parses `BASE/TARGET` into an uppercase pair.
pub fn parse_pair(input: &str) -> Result<(String, String)> {
    let mut parts = input.trim().split('/').map(str::trim);
    let base = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");
    if base.is_empty() || target.is_empty() || parts.next().is_some() {
        return Err(Error::InputFormat(
            "expected two currency codes separated by a forward slash(/)".to_string(),
        ));
    }
    Ok((base.to_uppercase(), target.to_uppercase()))
}

/// Parses `BASE/T1/T2/...` into an uppercase base plus at least one target.
pub fn parse_multi(input: &str) -> Result<(String, Vec<String>)> {
    let mut parts = input
        .trim()
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase);
    let base = parts
        .next()
        .ok_or_else(|| Error::InputFormat("missing base currency".to_string()))?;
    let targets: Vec<String> = parts.collect();
    if targets.is_empty() {
        return Err(Error::InputFormat(
            "expected a base and at least one target currency separated by a forward slash(/)"
                .to_string(),
        ));
    }
    Ok((base, targets))
}

/// Parses `BASE/TARGET@AMOUNT` (whitespace around `@` tolerated).
///
/// A missing `@` or slash is a format error; a non-numeric amount is an
/// amount error, kept distinct so the user gets the right hint.
pub fn parse_amount_pair(input: &str) -> Result<(String, String, f64)> {
    let (pair, amount) = input
        .trim()
        .split_once('@')
        .ok_or_else(|| Error::InputFormat("expected BASE/TARGET@AMOUNT".to_string()))?;
    let (base, target) = parse_pair(pair)?;
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("not a number: {}", amount.trim())))?;
    Ok((base, target, amount))
}

/// Renders the single-pair result the way the bot manual documents it.
pub fn render_single_rate(base: &str, target: &str, rate: f64) -> String {
    format!(
        "<b>Base Currency:</b> {base}\n\
         <b>Target Currency:</b> {target}\n\
         <b>Exchange Rate:</b> {rate}\n\n\
         <i>This means that 1 {base} is equal to {rate} {target}</i>"
    )
}

/// Renders one `CODE = rate` line per target, in input order.
///
/// A target missing from the upstream response means the payload is
/// malformed for our request and surfaces as an upstream error.
pub fn render_multi_rates(targets: &[String], rates: &LiveRates) -> Result<String> {
    let mut lines = Vec::with_capacity(targets.len());
    for code in targets {
        let rate = rates
            .rate(code)
            .ok_or_else(|| Error::Upstream(format!("missing rate for {code} in response")))?;
        lines.push(format!("<b>{code}</b> = {rate}"));
    }
    Ok(lines.join("\n"))
}

/// Renders the converted-amount result for `BASE/TARGET@AMOUNT` queries.
pub fn render_conversion(
    base: &str,
    target: &str,
    rate: f64,
    base_amount: f64,
    converted_amount: f64,
) -> String {
    format!(
        "<b>Base Currency:</b> {base}\n\
         <b>Target Currency:</b> {target}\n\
         <b>Exchange Rate:</b> {rate}\n\n\
         <i>This means that {base_amount} {base} is equal to {converted_amount} {target}</i>"
    )
}

/// Renders the daily digest body for one user.
pub fn render_digest(base: &str, targets: &[String], rates: &LiveRates) -> Result<String> {
    let mut body = format!(
        "<b>Latest update on exchange rates relative to {base}</b>\n\
         This means that 1 {base} is equal to the following in different currencies:\n\n"
    );
    for code in targets {
        let rate = rates
            .rate(code)
            .ok_or_else(|| Error::Upstream(format!("missing rate for {code} in response")))?;
        body.push_str(&format!("<b>{code}</b>: {rate}\n"));
    }
    Ok(body)
}
