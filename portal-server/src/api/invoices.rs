//! Invoice endpoints and Stripe checkout

use axum::routing::{get, post};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Invoice, InvoiceCreate, InvoiceStatus, InvoiceUpdate, Scope};

use crate::auth::CurrentUser;
use crate::db::invoices::InvoiceFilter;
use crate::state::AppState;
use crate::{db, security_log, stripe};

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list_invoices).post(create_invoice))
        .route("/api/invoices/{id}", get(get_invoice).patch(update_invoice))
        .route("/api/invoices/{id}/issue", post(issue_invoice))
        .route("/api/invoices/{id}/void", post(void_invoice))
        .route("/api/invoices/{id}/paid", post(mark_paid))
        .route("/api/invoices/{id}/checkout", post(create_checkout))
}

async fn load_visible(state: &AppState, current: &CurrentUser, id: i64) -> Result<Invoice, AppError> {
    let invoice = db::invoices::get(&state.pool, id).await?;
    let client = db::clients::get(&state.pool, invoice.client_id).await?;
    current.ensure_client_visible(&client)?;
    Ok(invoice)
}

fn audit_detail(invoice: &Invoice) -> Option<serde_json::Value> {
    Some(serde_json::json!({
        "number": invoice.number,
        "total_usd": invoice.total_usd,
        "status": invoice.status,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub client_id: Option<i64>,
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
}

/// GET /api/invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<Vec<Invoice>> {
    let filter = InvoiceFilter {
        client_id: query.client_id,
        status: query.status,
        limit: db::clamp_limit(query.limit),
    };
    let invoices = db::invoices::list(&state.pool, current.scope, &filter).await?;
    Ok(Json(invoices))
}

/// POST /api/invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<InvoiceCreate>,
) -> ApiResult<Invoice> {
    current.require_staff()?;
    let invoice = db::invoices::create(&state.pool, &req).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "create_invoice",
        "invoice",
        invoice.id,
        audit_detail(&invoice),
    )
    .await;
    Ok(Json(invoice))
}

/// GET /api/invoices/{id}
pub async fn get_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Invoice> {
    Ok(Json(load_visible(&state, &current, id).await?))
}

/// PATCH /api/invoices/{id}
pub async fn update_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<InvoiceUpdate>,
) -> ApiResult<Invoice> {
    current.require_staff()?;
    let invoice = db::invoices::update(&state.pool, id, &req).await?;
    db::audit::record(
        &state.pool,
        current.id,
        "update_invoice",
        "invoice",
        id,
        audit_detail(&invoice),
    )
    .await;
    Ok(Json(invoice))
}

/// POST /api/invoices/{id}/issue
pub async fn issue_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Invoice> {
    current.require_staff()?;
    let invoice = db::invoices::issue(&state.pool, id).await?;
    db::audit::record(&state.pool, current.id, "issue_invoice", "invoice", id, audit_detail(&invoice))
        .await;
    Ok(Json(invoice))
}

/// POST /api/invoices/{id}/void
pub async fn void_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Invoice> {
    current.require_staff()?;
    let invoice = db::invoices::void(&state.pool, id).await?;
    db::audit::record(&state.pool, current.id, "void_invoice", "invoice", id, audit_detail(&invoice))
        .await;
    Ok(Json(invoice))
}

/// POST /api/invoices/{id}/paid
pub async fn mark_paid(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Invoice> {
    current.require_staff()?;
    let invoice = db::invoices::mark_paid(&state.pool, id).await?;
    db::audit::record(&state.pool, current.id, "mark_paid", "invoice", id, audit_detail(&invoice))
        .await;
    Ok(Json(invoice))
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

/// POST /api/invoices/{id}/checkout
///
/// Reuses the invoice's current session while it is far from expiring.
pub async fn create_checkout(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<CheckoutResponse> {
    let invoice = load_visible(&state, &current, id).await?;
    let is_owner = current.scope == Scope::Client(invoice.client_id);
    if !(current.is_staff() || is_owner) {
        security_log!("WARN", "checkout_denied", user_id = current.id, invoice_id = id);
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }
    invoice.ensure_payable()?;

    if let Some((session_id, url)) = invoice.reusable_checkout(shared::util::now_millis()) {
        return Ok(Json(CheckoutResponse {
            checkout_url: url.to_string(),
            session_id: session_id.to_string(),
        }));
    }

    let session = stripe::create_payment_checkout_session(
        &state.config.stripe_secret_key,
        &invoice,
        &state.config.checkout_success_url(id),
        &state.config.checkout_cancel_url(id),
    )
    .await
    .map_err(|e| {
        tracing::error!(invoice_id = id, "Stripe checkout failed: {e}");
        AppError::new(ErrorCode::PaymentSetupFailed)
    })?;

    db::invoices::set_checkout(&state.pool, id, &session.id, &session.url, session.expires_at)
        .await?;
    tracing::info!(invoice_id = id, session_id = %session.id, "Checkout session created");

    Ok(Json(CheckoutResponse {
        checkout_url: session.url,
        session_id: session.id,
    }))
}
