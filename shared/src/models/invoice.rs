//! Invoice Model
//!
//! Line totals are `quantity × unit_price_usd` rounded to cents; the invoice
//! total is the sum of line totals. Both are recomputed server-side on every
//! edit, client-supplied totals are ignored.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "open" => Some(Self::Open),
            "paid" => Some(Self::Paid),
            "void" => Some(Self::Void),
            _ => None,
        }
    }

    /// draft → open → paid, and draft/open → void
    pub fn can_transition(&self, to: InvoiceStatus) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Open)
                | (Self::Open, Self::Paid)
                | (Self::Draft, Self::Void)
                | (Self::Open, Self::Void)
        )
    }

    pub fn ensure_transition(&self, to: InvoiceStatus) -> Result<(), AppError> {
        if *self == Self::Paid && to != Self::Paid {
            return Err(AppError::new(ErrorCode::InvoiceAlreadyPaid));
        }
        if !self.can_transition(to) {
            return Err(AppError::new(ErrorCode::InvoiceInvalidTransition)
                .with_detail("from", self.as_str())
                .with_detail("to", to.as_str()));
        }
        Ok(())
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::Open)
    }
}

impl TryFrom<String> for InvoiceStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownStatus(value))
    }
}

/// Priced invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price_usd: Decimal,
    pub total_usd: Decimal,
}

/// Invoice line as submitted by staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price_usd: Decimal,
}

/// Billing document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: i64,
    /// Sequential invoice number
    pub number: i64,
    pub client_id: i64,
    pub shipment_id: Option<i64>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<InvoiceItem>,
    pub total_usd: Decimal,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub stripe_session_id: Option<String>,
    pub checkout_url: Option<String>,
    /// Stripe session expiry (Unix millis)
    pub checkout_expires_at: Option<i64>,
    pub paid_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create invoice payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceCreate {
    pub client_id: i64,
    pub shipment_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<InvoiceItemInput>,
    pub notes: Option<String>,
}

/// Update invoice payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceUpdate {
    pub items: Option<Vec<InvoiceItemInput>>,
    pub notes: Option<String>,
}

/// Largest amount a line or an invoice may carry (`NUMERIC(14,2)`).
pub const MAX_AMOUNT_USD: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// A checkout session expiring sooner than this is replaced rather than reused.
pub const CHECKOUT_REUSE_MARGIN_MS: i64 = 5 * 60 * 1000;

fn amount_out_of_range(index: Option<usize>) -> AppError {
    let err = AppError::with_message(ErrorCode::ValueOutOfRange, "Amount out of range")
        .with_detail("max", MAX_AMOUNT_USD.to_string());
    match index {
        Some(index) => err.with_detail("index", index),
        None => err,
    }
}

/// Round to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate and price the submitted lines.
pub fn price_items(inputs: &[InvoiceItemInput]) -> Result<Vec<InvoiceItem>, AppError> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let description = input.description.trim();
            if description.is_empty() {
                return Err(AppError::validation("Item description is required")
                    .with_detail("index", index));
            }
            if input.quantity <= Decimal::ZERO {
                return Err(AppError::validation("Item quantity must be positive")
                    .with_detail("index", index));
            }
            if input.unit_price_usd.is_sign_negative() {
                return Err(AppError::validation("Item price cannot be negative")
                    .with_detail("index", index));
            }
            let total_usd = input
                .quantity
                .checked_mul(input.unit_price_usd)
                .map(round_cents)
                .filter(|total| *total <= MAX_AMOUNT_USD)
                .ok_or_else(|| amount_out_of_range(Some(index)))?;
            Ok(InvoiceItem {
                description: description.to_string(),
                quantity: input.quantity,
                unit_price_usd: input.unit_price_usd,
                total_usd,
            })
        })
        .collect()
}

/// Invoice total: sum of line totals.
pub fn invoice_total(items: &[InvoiceItem]) -> Result<Decimal, AppError> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total_usd))
        .filter(|total| *total <= MAX_AMOUNT_USD)
        .ok_or_else(|| amount_out_of_range(None))
}

/// Amount in cents, as Stripe expects.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    round_cents(amount).checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

impl Invoice {
    pub fn ensure_editable(&self) -> Result<(), AppError> {
        if !self.status.is_editable() {
            return Err(AppError::new(ErrorCode::InvoiceNotEditable)
                .with_detail("invoice_id", self.id)
                .with_detail("status", self.status.as_str()));
        }
        Ok(())
    }

    /// An invoice can be issued once it bills something.
    pub fn ensure_issuable(&self) -> Result<(), AppError> {
        self.status.ensure_transition(InvoiceStatus::Open)?;
        if self.items.is_empty() || self.total_usd <= Decimal::ZERO {
            return Err(AppError::new(ErrorCode::InvoiceEmpty).with_detail("invoice_id", self.id));
        }
        Ok(())
    }

    /// Live checkout session worth handing out again.
    pub fn reusable_checkout(&self, now: i64) -> Option<(&str, &str)> {
        let expires_at = self.checkout_expires_at?;
        if expires_at <= now + CHECKOUT_REUSE_MARGIN_MS {
            return None;
        }
        Some((self.stripe_session_id.as_deref()?, self.checkout_url.as_deref()?))
    }

    pub fn ensure_payable(&self) -> Result<(), AppError> {
        match self.status {
            InvoiceStatus::Open => Ok(()),
            InvoiceStatus::Paid => Err(AppError::new(ErrorCode::InvoiceAlreadyPaid)),
            _ => Err(AppError::new(ErrorCode::InvoiceNotOpen)
                .with_detail("status", self.status.as_str())),
        }
    }
}
