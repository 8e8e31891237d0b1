//! Stripe webhook handler
//!
//! POST /stripe/webhook settles invoices paid through Checkout (raw body
//! for signature verification)

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::db::invoices::PaymentOutcome;
use crate::state::AppState;
use crate::{db, security_log, stripe};

/// Handle incoming Stripe webhook events
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            security_log!("WARN", "webhook_missing_signature", path = "/stripe/webhook");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.config.stripe_webhook_secret)
    {
        security_log!("WARN", "webhook_bad_signature", error = e);
        return StatusCode::BAD_REQUEST;
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    let Some(event_id) = event["id"].as_str() else {
        tracing::warn!("Webhook event missing id");
        return StatusCode::BAD_REQUEST;
    };
    tracing::info!(event_type, event_id, "Received Stripe webhook");

    // Idempotency: record first, a repeated delivery inserts nothing
    match db::webhook_events::record(&state.pool, event_id, event_type).await {
        Ok(false) => {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Ok(true) => {}
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    let status = match event_type {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            handle_checkout_completed(&state, &event).await
        }
        _ => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };

    // Let Stripe retry events we failed to apply
    if status.is_server_error()
        && let Err(e) = db::webhook_events::forget(&state.pool, event_id).await
    {
        tracing::error!(%e, event_id, "Failed to release webhook event for retry");
    }
    status
}

/// checkout.session.completed → mark the invoice paid
async fn handle_checkout_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event.get("data").and_then(|d| d.get("object")) else {
        return StatusCode::OK;
    };

    // Delayed payment methods complete the session before the money arrives
    if obj["payment_status"].as_str() == Some("unpaid") {
        tracing::info!("Checkout completed with unpaid status, waiting for async payment");
        return StatusCode::OK;
    }

    let invoice_id = obj
        .get("metadata")
        .and_then(|m| m["invoice_id"].as_str())
        .or_else(|| obj["client_reference_id"].as_str())
        .and_then(|s| s.parse::<i64>().ok());
    let Some(invoice_id) = invoice_id else {
        tracing::warn!("checkout.session.completed without invoice reference");
        return StatusCode::OK;
    };
    let session_id = obj["id"].as_str().unwrap_or("");
    let amount_total = obj["amount_total"].as_i64();

    match db::invoices::settle_from_checkout(&state.pool, invoice_id, session_id, amount_total).await {
        Ok(PaymentOutcome::Paid(invoice)) => {
            tracing::info!(
                invoice_id,
                number = invoice.number,
                session_id,
                "Invoice paid via Stripe checkout"
            );
            let detail = serde_json::json!({
                "session_id": session_id,
                "total_usd": invoice.total_usd,
            });
            db::audit::record(
                &state.pool,
                db::audit::SYSTEM_ACTOR,
                "invoice_paid_stripe",
                "invoice",
                invoice_id,
                Some(detail),
            )
            .await;
            StatusCode::OK
        }
        Ok(PaymentOutcome::AlreadyPaid) => {
            tracing::info!(invoice_id, "Invoice already paid, ignoring checkout event");
            StatusCode::OK
        }
        Ok(PaymentOutcome::NotPayable(reason)) => {
            tracing::warn!(
                invoice_id,
                reason = reason.as_str(),
                detail = ?reason,
                session_id,
                amount_total = ?amount_total,
                "Payment not applied to invoice, needs manual review"
            );
            let detail = serde_json::json!({
                "session_id": session_id,
                "reason": reason.as_str(),
                "amount_total": amount_total,
            });
            db::audit::record(
                &state.pool,
                db::audit::SYSTEM_ACTOR,
                "payment_needs_review",
                "invoice",
                invoice_id,
                Some(detail),
            )
            .await;
            StatusCode::OK
        }
        Err(e) => {
            let err: shared::error::AppError = e.into();
            if err.code == shared::error::ErrorCode::InvoiceNotFound {
                tracing::warn!(invoice_id, "Checkout event for unknown invoice");
                return StatusCode::OK;
            }
            tracing::error!(invoice_id, error = %err.message, "Failed to settle invoice");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
