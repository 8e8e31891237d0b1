//! Shipment Model

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

use super::UnknownStatus;
use super::shipping_box::{BoxStatus, BoxType, ShippingBox};

/// Shipment status, forward-only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Open,
    Shipped,
    Arrived,
    Closed,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Shipped => "shipped",
            Self::Arrived => "arrived",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "shipped" => Some(Self::Shipped),
            "arrived" => Some(Self::Arrived),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// The single status that may follow this one.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Open => Some(Self::Shipped),
            Self::Shipped => Some(Self::Arrived),
            Self::Arrived => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    pub fn ensure_transition(&self, to: ShipmentStatus) -> Result<(), AppError> {
        if self.next() != Some(to) {
            return Err(AppError::new(ErrorCode::ShipmentInvalidTransition)
                .with_detail("from", self.as_str())
                .with_detail("to", to.as_str()));
        }
        Ok(())
    }
}

impl TryFrom<String> for ShipmentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownStatus(value))
    }
}

/// A group of closed boxes travelling together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Shipment {
    pub id: i64,
    pub code: i64,
    pub country: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub box_type: BoxType,
    pub box_ids: Vec<i64>,
    pub client_ids: Vec<i64>,
    pub manager_uids: Vec<i64>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: ShipmentStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create shipment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentCreate {
    pub box_ids: Vec<i64>,
}

/// Add boxes payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentBoxesAdd {
    pub box_ids: Vec<i64>,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentStatusUpdate {
    pub status: ShipmentStatus,
}

/// A box may join a shipment when it is closed and not already linked.
pub fn check_box_eligible(b: &ShippingBox) -> Result<(), AppError> {
    if b.status != BoxStatus::Closed {
        return Err(AppError::new(ErrorCode::BoxNotClosed).with_detail("box_id", b.id));
    }
    b.ensure_unlinked()
}

/// Validate a set of boxes as one shipment and return its country and type.
pub fn check_uniform(boxes: &[ShippingBox]) -> Result<(String, BoxType), AppError> {
    let first = boxes
        .first()
        .ok_or_else(|| AppError::new(ErrorCode::ShipmentEmpty))?;

    for b in boxes {
        check_box_eligible(b)?;
        if b.country != first.country {
            return Err(AppError::new(ErrorCode::ShipmentMixedCountry)
                .with_detail("box_id", b.id)
                .with_detail("expected", first.country.clone())
                .with_detail("found", b.country.clone()));
        }
        if b.box_type != first.box_type {
            return Err(AppError::new(ErrorCode::ShipmentMixedType)
                .with_detail("box_id", b.id)
                .with_detail("expected", first.box_type.as_str())
                .with_detail("found", b.box_type.as_str()));
        }
    }

    Ok((first.country.clone(), first.box_type))
}

/// Sorted, de-duplicated union of ids.
pub fn merge_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut out: Vec<i64> = ids.into_iter().collect();
    out.sort_unstable();
    out.dedup();
    out
}

impl Shipment {
    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.status != ShipmentStatus::Open {
            return Err(AppError::new(ErrorCode::ShipmentNotOpen)
                .with_detail("shipment_id", self.id)
                .with_detail("status", self.status.as_str()));
        }
        Ok(())
    }

    /// Boxes joining an existing shipment must match its country and type.
    pub fn check_compatible(&self, b: &ShippingBox) -> Result<(), AppError> {
        check_box_eligible(b)?;
        if b.country != self.country {
            return Err(AppError::new(ErrorCode::ShipmentMixedCountry)
                .with_detail("box_id", b.id)
                .with_detail("expected", self.country.clone()));
        }
        if b.box_type != self.box_type {
            return Err(AppError::new(ErrorCode::ShipmentMixedType)
                .with_detail("box_id", b.id)
                .with_detail("expected", self.box_type.as_str()));
        }
        Ok(())
    }
}
