//! Invoices
//!
//! Totals are always computed here from the submitted lines, never taken
//! from the caller.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Invoice, InvoiceCreate, InvoiceStatus, InvoiceUpdate, Scope, invoice_total, price_items,
    to_cents,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use super::{clients, counters, shipments};
use crate::error::ServiceResult;

pub(crate) const INVOICE_COLUMNS: &str = "i.id, i.number, i.client_id, i.shipment_id, i.items, \
     i.total_usd, i.status, i.notes, i.stripe_session_id, i.checkout_url, i.checkout_expires_at, \
     i.paid_at, i.created_at, i.updated_at";

const RETURNING: &str = "RETURNING id, number, client_id, shipment_id, items, total_usd, status, \
     notes, stripe_session_id, checkout_url, checkout_expires_at, paid_at, created_at, updated_at";

#[derive(Debug, Default)]
pub struct InvoiceFilter {
    pub client_id: Option<i64>,
    pub status: Option<InvoiceStatus>,
    pub limit: i64,
}

fn not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::InvoiceNotFound).with_detail("invoice_id", id)
}

pub async fn find(pool: &PgPool, id: i64) -> ServiceResult<Option<Invoice>> {
    let invoice = sqlx::query_as(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(invoice)
}

pub async fn get(pool: &PgPool, id: i64) -> ServiceResult<Invoice> {
    Ok(find(pool, id).await?.ok_or_else(|| not_found(id))?)
}

async fn lock(conn: &mut PgConnection, id: i64) -> ServiceResult<Invoice> {
    let invoice: Option<Invoice> = sqlx::query_as(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(invoice.ok_or_else(|| not_found(id))?)
}

pub async fn list(pool: &PgPool, scope: Scope, filter: &InvoiceFilter) -> ServiceResult<Vec<Invoice>> {
    let (manager, client) = scope.filters();
    let invoices = sqlx::query_as(&format!(
        r#"
        SELECT {INVOICE_COLUMNS}
        FROM invoices i
        JOIN clients c ON c.id = i.client_id
        WHERE ($1::BIGINT IS NULL OR c.manager_uid = $1)
          AND ($2::BIGINT IS NULL OR i.client_id = $2)
          AND ($3::BIGINT IS NULL OR i.client_id = $3)
          AND ($4::TEXT IS NULL OR i.status = $4)
        ORDER BY i.number DESC
        LIMIT $5
        "#
    ))
    .bind(manager)
    .bind(client)
    .bind(filter.client_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;
    Ok(invoices)
}

/// Create a draft invoice with the next invoice number.
pub async fn create(pool: &PgPool, data: &InvoiceCreate) -> ServiceResult<Invoice> {
    let items = price_items(&data.items)?;
    let total = invoice_total(&items)?;

    clients::get(pool, data.client_id).await?;
    if let Some(shipment_id) = data.shipment_id {
        shipments::get(pool, shipment_id).await?;
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    let number = counters::next_value(&mut tx, counters::INVOICES).await?;

    let invoice: Invoice = sqlx::query_as(&format!(
        r#"
        INSERT INTO invoices (id, number, client_id, shipment_id, items, total_usd, status, notes,
                              created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'draft', $7, $8, $8)
        {RETURNING}
        "#
    ))
    .bind(shared::util::snowflake_id())
    .bind(number)
    .bind(data.client_id)
    .bind(data.shipment_id)
    .bind(Json(&items))
    .bind(total)
    .bind(&data.notes)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(invoice_id = invoice.id, number, total_usd = %total, "Invoice created");
    Ok(invoice)
}

/// Replace lines and/or notes of a draft or open invoice.
///
/// Changing the lines of an open invoice drops its checkout session, whose
/// amount no longer matches.
pub async fn update(pool: &PgPool, id: i64, data: &InvoiceUpdate) -> ServiceResult<Invoice> {
    let mut tx = pool.begin().await?;
    let mut invoice = lock(&mut tx, id).await?;
    invoice.ensure_editable()?;

    let mut reset_checkout = false;
    if let Some(inputs) = &data.items {
        let items = price_items(inputs)?;
        invoice.total_usd = invoice_total(&items)?;
        invoice.items = items;
        reset_checkout = invoice.stripe_session_id.is_some();
        if invoice.status == InvoiceStatus::Open && invoice.total_usd.is_zero() {
            return Err(AppError::new(ErrorCode::InvoiceEmpty)
                .with_detail("invoice_id", id)
                .into());
        }
    }
    if data.notes.is_some() {
        invoice.notes = data.notes.clone();
    }

    let updated: Invoice = sqlx::query_as(&format!(
        r#"
        UPDATE invoices SET
            items = $1, total_usd = $2, notes = $3,
            stripe_session_id = CASE WHEN $4 THEN NULL ELSE stripe_session_id END,
            checkout_url = CASE WHEN $4 THEN NULL ELSE checkout_url END,
            checkout_expires_at = CASE WHEN $4 THEN NULL ELSE checkout_expires_at END,
            updated_at = $5
        WHERE id = $6
        {RETURNING}
        "#
    ))
    .bind(Json(&invoice.items))
    .bind(invoice.total_usd)
    .bind(&invoice.notes)
    .bind(reset_checkout)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

async fn set_status(
    conn: &mut PgConnection,
    id: i64,
    status: InvoiceStatus,
    paid_at: Option<i64>,
) -> ServiceResult<Invoice> {
    let invoice = sqlx::query_as(&format!(
        r#"
        UPDATE invoices SET
            status = $1,
            paid_at = COALESCE($2, paid_at),
            checkout_url = CASE WHEN $1 = 'void' THEN NULL ELSE checkout_url END,
            checkout_expires_at = CASE WHEN $1 = 'void' THEN NULL ELSE checkout_expires_at END,
            updated_at = $3
        WHERE id = $4
        {RETURNING}
        "#
    ))
    .bind(status.as_str())
    .bind(paid_at)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(invoice)
}

/// draft → open
pub async fn issue(pool: &PgPool, id: i64) -> ServiceResult<Invoice> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id).await?.ensure_issuable()?;
    let invoice = set_status(&mut tx, id, InvoiceStatus::Open, None).await?;
    tx.commit().await?;
    tracing::info!(invoice_id = id, number = invoice.number, "Invoice issued");
    Ok(invoice)
}

/// draft | open → void
pub async fn void(pool: &PgPool, id: i64) -> ServiceResult<Invoice> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id)
        .await?
        .status
        .ensure_transition(InvoiceStatus::Void)?;
    let invoice = set_status(&mut tx, id, InvoiceStatus::Void, None).await?;
    tx.commit().await?;
    tracing::info!(invoice_id = id, number = invoice.number, "Invoice voided");
    Ok(invoice)
}

/// open → paid, recorded manually by staff
pub async fn mark_paid(pool: &PgPool, id: i64) -> ServiceResult<Invoice> {
    let mut tx = pool.begin().await?;
    lock(&mut tx, id).await?.ensure_payable()?;
    let invoice =
        set_status(&mut tx, id, InvoiceStatus::Paid, Some(shared::util::now_millis())).await?;
    tx.commit().await?;
    tracing::info!(invoice_id = id, number = invoice.number, "Invoice marked paid");
    Ok(invoice)
}

/// Outcome of a Stripe payment confirmation
#[derive(Debug)]
pub enum PaymentOutcome {
    Paid(Invoice),
    AlreadyPaid,
    /// Payment was not applied and needs manual review
    NotPayable(NotPayableReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotPayableReason {
    /// Invoice is draft or void
    Status(InvoiceStatus),
    /// Session is not the one currently attached to the invoice
    StaleSession { current: Option<String> },
    /// Charged amount differs from the invoice total
    AmountMismatch { expected: Option<i64>, received: Option<i64> },
}

impl NotPayableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status(_) => "invoice_not_open",
            Self::StaleSession { .. } => "stale_session",
            Self::AmountMismatch { .. } => "amount_mismatch",
        }
    }
}

/// Settle an invoice from a completed checkout session.
///
/// Only the session currently attached to the invoice, charging exactly the
/// invoice total, can mark it paid.
pub async fn settle_from_checkout(
    pool: &PgPool,
    id: i64,
    session_id: &str,
    amount_total: Option<i64>,
) -> ServiceResult<PaymentOutcome> {
    let mut tx = pool.begin().await?;
    let invoice = lock(&mut tx, id).await?;
    match invoice.status {
        InvoiceStatus::Paid => return Ok(PaymentOutcome::AlreadyPaid),
        InvoiceStatus::Open => {}
        other => return Ok(PaymentOutcome::NotPayable(NotPayableReason::Status(other))),
    }
    if invoice.stripe_session_id.as_deref() != Some(session_id) {
        return Ok(PaymentOutcome::NotPayable(NotPayableReason::StaleSession {
            current: invoice.stripe_session_id,
        }));
    }
    let expected = to_cents(invoice.total_usd);
    if expected.is_none() || amount_total != expected {
        return Ok(PaymentOutcome::NotPayable(NotPayableReason::AmountMismatch {
            expected,
            received: amount_total,
        }));
    }

    let paid =
        set_status(&mut tx, id, InvoiceStatus::Paid, Some(shared::util::now_millis())).await?;
    tx.commit().await?;
    Ok(PaymentOutcome::Paid(paid))
}

/// Remember the checkout session of an open invoice.
pub async fn set_checkout(
    pool: &PgPool,
    id: i64,
    session_id: &str,
    checkout_url: &str,
    expires_at: Option<i64>,
) -> ServiceResult<Invoice> {
    let invoice: Option<Invoice> = sqlx::query_as(&format!(
        r#"
        UPDATE invoices SET
            stripe_session_id = $1, checkout_url = $2, checkout_expires_at = $3, updated_at = $4
        WHERE id = $5 AND status = 'open'
        {RETURNING}
        "#
    ))
    .bind(session_id)
    .bind(checkout_url)
    .bind(expires_at)
    .bind(shared::util::now_millis())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(invoice.ok_or_else(|| AppError::new(ErrorCode::InvoiceNotOpen).with_detail("invoice_id", id))?)
}
