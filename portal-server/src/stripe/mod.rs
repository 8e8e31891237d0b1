//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use shared::models::{Invoice, round_cents, to_cents};

use crate::BoxError;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Hosted checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    /// Unix millis
    pub expires_at: Option<i64>,
}

/// Form fields for a one-off payment of an invoice.
///
/// A line is sent as `quantity × unit price` only when that product is exactly
/// its total in cents. Anything else (weights, sub-cent prices) goes as one
/// unit priced at the line total, so the session always charges the invoice total.
pub fn checkout_form(
    invoice: &Invoice,
    success_url: &str,
    cancel_url: &str,
) -> Result<Vec<(String, String)>, BoxError> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        ("client_reference_id".to_string(), invoice.id.to_string()),
        ("metadata[invoice_id]".to_string(), invoice.id.to_string()),
        ("metadata[invoice_number]".to_string(), invoice.number.to_string()),
    ];

    let mut charged = 0i64;
    for (i, item) in invoice.items.iter().filter(|it| !it.total_usd.is_zero()).enumerate() {
        let whole_units = item.quantity.fract().is_zero()
            && item.quantity > Decimal::ZERO
            && round_cents(item.unit_price_usd) == item.unit_price_usd;
        let (quantity, unit) = if whole_units {
            (item.quantity, item.unit_price_usd)
        } else {
            (Decimal::ONE, item.total_usd)
        };
        let cents = to_cents(unit)
            .ok_or_else(|| format!("Amount out of range on line {i}: {unit}"))?;
        let line_cents = quantity
            .checked_mul(Decimal::from(cents))
            .and_then(|c| i64::try_from(c).ok())
            .ok_or_else(|| format!("Amount out of range on line {i}"))?;
        charged = charged
            .checked_add(line_cents)
            .ok_or_else(|| format!("Amount out of range on line {i}"))?;
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), "usd".to_string()));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.description.clone(),
        ));
        form.push((format!("{prefix}[price_data][unit_amount]"), cents.to_string()));
        form.push((format!("{prefix}[quantity]"), quantity.normalize().to_string()));
    }

    let expected = to_cents(invoice.total_usd)
        .ok_or_else(|| format!("Invoice total out of range: {}", invoice.total_usd))?;
    if charged != expected {
        return Err(format!("Checkout lines charge {charged} cents, invoice total is {expected}").into());
    }

    Ok(form)
}

/// Create a Stripe Checkout Session (payment mode) for an open invoice
pub async fn create_payment_checkout_session(
    secret_key: &str,
    invoice: &Invoice,
    success_url: &str,
    cancel_url: &str,
) -> Result<CheckoutSession, BoxError> {
    let form = checkout_form(invoice, success_url, cancel_url)?;

    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .post(CHECKOUT_SESSIONS_URL)
        .basic_auth(secret_key, None::<&str>)
        .form(&form)
        .send()
        .await?
        .json()
        .await?;

    match (resp["id"].as_str(), resp["url"].as_str()) {
        (Some(id), Some(url)) => Ok(CheckoutSession {
            id: id.to_string(),
            url: url.to_string(),
            expires_at: resp["expires_at"].as_i64().map(|secs| secs * 1000),
        }),
        _ => Err(format!("Stripe create_checkout failed: {resp}").into()),
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Any v1 signature may match (Stripe sends several while rolling secrets)
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}
