//! Tracking Alert Model
//!
//! A client announces a tracking number it expects. Intake of a package with
//! that tracking resolves the alert.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Resolved,
    Ignored,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "ignored" => Some(Self::Ignored),
            _ => None,
        }
    }
}

impl TryFrom<String> for AlertStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownStatus(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TrackingAlert {
    pub id: i64,
    pub client_id: i64,
    pub tracking: String,
    pub note: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: AlertStatus,
    /// User that raised the alert
    pub created_by: i64,
    pub package_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create alert payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCreate {
    /// Ignored for `client` callers, who always alert for their own account
    pub client_id: Option<i64>,
    pub tracking: String,
    pub note: Option<String>,
}

impl TrackingAlert {
    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.status != AlertStatus::Open {
            return Err(AppError::new(ErrorCode::AlertNotOpen)
                .with_detail("alert_id", self.id)
                .with_detail("status", self.status.as_str()));
        }
        Ok(())
    }
}
