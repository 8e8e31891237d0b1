//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Authentication errors
/// - 2xxx: Permission errors
/// - 3xxx: Client errors
/// - 4xxx: Inbound package errors
/// - 5xxx: Box errors
/// - 6xxx: Shipment errors
/// - 7xxx: Invoice errors
/// - 8xxx: User and tracking alert errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Client errors (3xxx)
    Client,
    /// Inbound package errors (4xxx)
    Package,
    /// Box errors (5xxx)
    Box,
    /// Shipment errors (6xxx)
    Shipment,
    /// Invoice errors (7xxx)
    Invoice,
    /// User and alert errors (8xxx)
    Account,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Client,
            4000..5000 => Self::Package,
            5000..6000 => Self::Box,
            6000..7000 => Self::Shipment,
            7000..8000 => Self::Invoice,
            8000..9000 => Self::Account,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Client => "client",
            Self::Package => "package",
            Self::Box => "box",
            Self::Shipment => "shipment",
            Self::Invoice => "invoice",
            Self::Account => "account",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
