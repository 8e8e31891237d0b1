//! Box Model
//!
//! A box consolidates received packages of one client. Its weight is always
//! the sum of its items' weights.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

use super::UnknownStatus;
use super::package::{InboundPackage, PackageStatus};

/// Customs category of a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoxType {
    Comercial,
    Franquicia,
}

impl BoxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comercial => "COMERCIAL",
            Self::Franquicia => "FRANQUICIA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COMERCIAL" => Some(Self::Comercial),
            "FRANQUICIA" => Some(Self::Franquicia),
            _ => None,
        }
    }
}

impl TryFrom<String> for BoxType {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownStatus(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxStatus {
    Open,
    Closed,
}

impl BoxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl TryFrom<String> for BoxStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownStatus(value))
    }
}

/// Physical consolidation unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShippingBox {
    pub id: i64,
    /// Sequential display code
    pub code: i64,
    pub client_id: i64,
    pub country: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub box_type: BoxType,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: BoxStatus,
    pub item_ids: Vec<i64>,
    pub weight_lb: Decimal,
    pub shipment_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create box payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxCreate {
    pub client_id: i64,
    #[serde(rename = "type")]
    pub box_type: BoxType,
}

/// Box with its resolved packages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxDetail {
    #[serde(flatten)]
    pub shipping_box: ShippingBox,
    pub items: Vec<InboundPackage>,
}

/// Add items payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxItemsAdd {
    pub package_ids: Vec<i64>,
}

/// Sum of item weights.
pub fn total_weight<'a>(items: impl IntoIterator<Item = &'a InboundPackage>) -> Decimal {
    items.into_iter().map(|p| p.weight_lb).sum()
}

impl ShippingBox {
    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.status != BoxStatus::Open {
            return Err(AppError::new(ErrorCode::BoxClosed).with_detail("box_id", self.id));
        }
        Ok(())
    }

    pub fn ensure_unlinked(&self) -> Result<(), AppError> {
        if let Some(shipment_id) = self.shipment_id {
            return Err(AppError::new(ErrorCode::BoxInShipment)
                .with_detail("box_id", self.id)
                .with_detail("shipment_id", shipment_id));
        }
        Ok(())
    }

    /// Only empty boxes that never left for a shipment can be deleted.
    pub fn ensure_deletable(&self) -> Result<(), AppError> {
        if !self.item_ids.is_empty() {
            return Err(AppError::new(ErrorCode::BoxNotEmpty)
                .with_detail("box_id", self.id)
                .with_detail("items", self.item_ids.len()));
        }
        self.ensure_unlinked()
    }

    pub fn ensure_closable(&self) -> Result<(), AppError> {
        self.ensure_open()?;
        if self.item_ids.is_empty() {
            return Err(AppError::new(ErrorCode::BoxEmpty).with_detail("box_id", self.id));
        }
        Ok(())
    }

    pub fn ensure_reopenable(&self) -> Result<(), AppError> {
        if self.status != BoxStatus::Closed {
            return Err(AppError::new(ErrorCode::BoxNotClosed).with_detail("box_id", self.id));
        }
        self.ensure_unlinked()
    }

    /// A package may join this box when it is received, unboxed and owned by
    /// the same client.
    pub fn check_item(&self, package: &InboundPackage) -> Result<(), AppError> {
        if package.client_id != self.client_id {
            return Err(AppError::new(ErrorCode::PackageClientMismatch)
                .with_detail("package_id", package.id)
                .with_detail("box_client_id", self.client_id));
        }
        if package.box_id.is_some() || package.status == PackageStatus::Boxed {
            return Err(AppError::new(ErrorCode::PackageAlreadyBoxed)
                .with_detail("package_id", package.id));
        }
        if package.status != PackageStatus::Received {
            return Err(AppError::new(ErrorCode::PackageNotReceived)
                .with_detail("package_id", package.id));
        }
        Ok(())
    }

    /// Append item ids, keeping existing order and skipping duplicates.
    pub fn with_items(&self, package_ids: &[i64]) -> Vec<i64> {
        let mut ids = self.item_ids.clone();
        for id in package_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}
