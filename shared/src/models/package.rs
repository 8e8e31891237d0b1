//! Inbound Package Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

use super::UnknownStatus;

/// Inbound package lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Received,
    Boxed,
    Void,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Boxed => "boxed",
            Self::Void => "void",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(Self::Received),
            "boxed" => Some(Self::Boxed),
            "void" => Some(Self::Void),
            _ => None,
        }
    }
}

impl TryFrom<String> for PackageStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownStatus(value))
    }
}

/// A tracking-numbered parcel received at the warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InboundPackage {
    pub id: i64,
    pub tracking: String,
    pub carrier: Option<String>,
    pub client_id: i64,
    pub weight_lb: Decimal,
    pub photo_url: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: PackageStatus,
    pub box_id: Option<i64>,
    pub notes: Option<String>,
    pub received_at: i64,
    pub updated_at: i64,
}

/// Receive package payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageCreate {
    pub tracking: String,
    pub carrier: Option<String>,
    pub client_id: i64,
    pub weight_lb: Decimal,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
}

/// Update package payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageUpdate {
    pub carrier: Option<String>,
    pub weight_lb: Option<Decimal>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
}

/// Canonical tracking form: upper-case, no whitespace or dashes.
pub fn normalize_tracking(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Heaviest single package accepted at intake, in pounds.
pub const MAX_WEIGHT_LB: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Weights are stored with three decimals; finer values would be silently rounded.
pub fn validate_weight(weight_lb: Decimal) -> Result<(), AppError> {
    let weight = weight_lb.normalize();
    if weight.is_sign_negative() || weight > MAX_WEIGHT_LB || weight.scale() > 3 {
        return Err(AppError::new(ErrorCode::PackageInvalidWeight)
            .with_detail("weight_lb", weight_lb.to_string())
            .with_detail("max", MAX_WEIGHT_LB.to_string()));
    }
    Ok(())
}

impl InboundPackage {
    /// Package can be voided only before it is boxed.
    pub fn ensure_voidable(&self) -> Result<(), AppError> {
        match self.status {
            PackageStatus::Received => Ok(()),
            PackageStatus::Boxed => Err(AppError::new(ErrorCode::PackageAlreadyBoxed)
                .with_detail("package_id", self.id)),
            PackageStatus::Void => Err(AppError::new(ErrorCode::PackageNotReceived)
                .with_detail("package_id", self.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn package(status: PackageStatus) -> InboundPackage {
        InboundPackage {
            id: 1,
            tracking: "1Z999".into(),
            carrier: None,
            client_id: 10,
            weight_lb: dec!(2.5),
            photo_url: None,
            status,
            box_id: None,
            notes: None,
            received_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_normalize_tracking() {
        assert_eq!(normalize_tracking(" 1z 999-aa "), "1Z999AA");
        assert_eq!(normalize_tracking("TBA123"), "TBA123");
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight(dec!(0)).is_ok());
        assert!(validate_weight(dec!(10.25)).is_ok());
        let err = validate_weight(dec!(-1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PackageInvalidWeight);
    }

    #[test]
    fn test_validate_weight_upper_bound_and_precision() {
        assert!(validate_weight(MAX_WEIGHT_LB).is_ok());
        assert!(validate_weight(dec!(2.125)).is_ok());
        assert!(validate_weight(dec!(2.1250)).is_ok());
        assert!(validate_weight(dec!(10000.001)).is_err());
        assert!(validate_weight(dec!(1000000000000000)).is_err());
        assert!(validate_weight(Decimal::MAX).is_err());
        let err = validate_weight(dec!(1.0005)).unwrap_err();
        assert_eq!(err.code, ErrorCode::PackageInvalidWeight);
    }

    #[test]
    fn test_void_only_from_received() {
        assert!(package(PackageStatus::Received).ensure_voidable().is_ok());
        assert_eq!(
            package(PackageStatus::Boxed).ensure_voidable().unwrap_err().code,
            ErrorCode::PackageAlreadyBoxed
        );
        assert_eq!(
            package(PackageStatus::Void).ensure_voidable().unwrap_err().code,
            ErrorCode::PackageNotReceived
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(PackageStatus::parse("boxed"), Some(PackageStatus::Boxed));
        assert_eq!(PackageStatus::parse("lost"), None);
        assert!(PackageStatus::try_from("BOXED".to_string()).is_err());
    }
}
