//! Unified error codes for the freight portal
//!
//! This module defines all error codes returned by portal-server and understood
//! by the admin/partner/client frontends.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Client errors
//! - 4xxx: Inbound package errors
//! - 5xxx: Box errors
//! - 6xxx: Shipment errors
//! - 7xxx: Invoice errors
//! - 8xxx: User and tracking alert errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Too many login attempts
    TooManyAttempts = 1005,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Password too short
    PasswordTooShort = 1008,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Staff role required
    StaffRequired = 2003,
    /// Superadmin role required
    SuperadminRequired = 2004,
    /// Client is outside the caller's scope
    ClientOutOfScope = 2005,

    // ==================== 3xxx: Client ====================
    /// Client not found
    ClientNotFound = 3001,
    /// Client account is inactive
    ClientInactive = 3002,
    /// Client still has packages, boxes or invoices
    ClientHasDependents = 3003,
    /// Client has no login account
    ClientHasNoAccount = 3004,
    /// Manager is not an active partner admin
    ClientInvalidManager = 3005,

    // ==================== 4xxx: Inbound package ====================
    /// Package not found
    PackageNotFound = 4001,
    /// Tracking number already received
    PackageTrackingExists = 4002,
    /// Package is not in `received` state
    PackageNotReceived = 4003,
    /// Package already belongs to a box
    PackageAlreadyBoxed = 4004,
    /// Package belongs to a different client
    PackageClientMismatch = 4005,
    /// Package weight is invalid
    PackageInvalidWeight = 4006,

    // ==================== 5xxx: Box ====================
    /// Box not found
    BoxNotFound = 5001,
    /// Box is closed
    BoxClosed = 5002,
    /// Box is not closed
    BoxNotClosed = 5003,
    /// Box has no items
    BoxEmpty = 5004,
    /// Box still has items
    BoxNotEmpty = 5005,
    /// Box is linked to a shipment
    BoxInShipment = 5006,
    /// Package is not in this box
    BoxItemNotFound = 5007,

    // ==================== 6xxx: Shipment ====================
    /// Shipment not found
    ShipmentNotFound = 6001,
    /// Shipment is no longer open
    ShipmentNotOpen = 6002,
    /// Boxes from different countries
    ShipmentMixedCountry = 6003,
    /// Boxes of different types
    ShipmentMixedType = 6004,
    /// Shipment has no boxes
    ShipmentEmpty = 6005,
    /// Status transition not allowed
    ShipmentInvalidTransition = 6006,

    // ==================== 7xxx: Invoice ====================
    /// Invoice not found
    InvoiceNotFound = 7001,
    /// Invoice can no longer be edited
    InvoiceNotEditable = 7002,
    /// Status transition not allowed
    InvoiceInvalidTransition = 7003,
    /// Invoice has no items or a zero total
    InvoiceEmpty = 7004,
    /// Invoice already paid
    InvoiceAlreadyPaid = 7005,
    /// Invoice is not open for payment
    InvoiceNotOpen = 7006,
    /// Payment setup failed (Stripe)
    PaymentSetupFailed = 7007,

    // ==================== 8xxx: User / Alert ====================
    /// User not found
    UserNotFound = 8001,
    /// Email already registered
    UserEmailExists = 8002,
    /// Cannot change own role or status
    UserCannotModifySelf = 8003,
    /// Tracking alert not found
    AlertNotFound = 8101,
    /// An open alert already exists for this tracking number
    AlertAlreadyOpen = 8102,
    /// Alert is no longer open
    AlertNotOpen = 8103,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::TooManyAttempts => "Too many attempts, please retry later",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::StaffRequired => "Staff role is required",
            ErrorCode::SuperadminRequired => "Superadmin role is required",
            ErrorCode::ClientOutOfScope => "Client is not visible to this account",

            // Client
            ErrorCode::ClientNotFound => "Client not found",
            ErrorCode::ClientInactive => "Client is inactive",
            ErrorCode::ClientHasDependents => "Client still has packages, boxes or invoices",
            ErrorCode::ClientHasNoAccount => "Client has no login account",
            ErrorCode::ClientInvalidManager => "Manager must be an active partner admin",

            // Package
            ErrorCode::PackageNotFound => "Package not found",
            ErrorCode::PackageTrackingExists => "Tracking number already received",
            ErrorCode::PackageNotReceived => "Package is not available",
            ErrorCode::PackageAlreadyBoxed => "Package already belongs to a box",
            ErrorCode::PackageClientMismatch => "Package belongs to a different client",
            ErrorCode::PackageInvalidWeight => "Package weight is invalid",

            // Box
            ErrorCode::BoxNotFound => "Box not found",
            ErrorCode::BoxClosed => "Box is closed",
            ErrorCode::BoxNotClosed => "Box is not closed",
            ErrorCode::BoxEmpty => "Box has no items",
            ErrorCode::BoxNotEmpty => "Box still has items",
            ErrorCode::BoxInShipment => "Box is linked to a shipment",
            ErrorCode::BoxItemNotFound => "Package is not in this box",

            // Shipment
            ErrorCode::ShipmentNotFound => "Shipment not found",
            ErrorCode::ShipmentNotOpen => "Shipment is no longer open",
            ErrorCode::ShipmentMixedCountry => "Boxes belong to different countries",
            ErrorCode::ShipmentMixedType => "Boxes have different types",
            ErrorCode::ShipmentEmpty => "Shipment has no boxes",
            ErrorCode::ShipmentInvalidTransition => "Shipment status transition not allowed",

            // Invoice
            ErrorCode::InvoiceNotFound => "Invoice not found",
            ErrorCode::InvoiceNotEditable => "Invoice can no longer be edited",
            ErrorCode::InvoiceInvalidTransition => "Invoice status transition not allowed",
            ErrorCode::InvoiceEmpty => "Invoice has no billable items",
            ErrorCode::InvoiceAlreadyPaid => "Invoice is already paid",
            ErrorCode::InvoiceNotOpen => "Invoice is not open for payment",
            ErrorCode::PaymentSetupFailed => "Payment setup failed",

            // User / Alert
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::UserEmailExists => "Email is already registered",
            ErrorCode::UserCannotModifySelf => "Cannot change own role or status",
            ErrorCode::AlertNotFound => "Tracking alert not found",
            ErrorCode::AlertAlreadyOpen => "An open alert already exists for this tracking",
            ErrorCode::AlertNotOpen => "Tracking alert is no longer open",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::TooManyAttempts),
            1007 => Ok(ErrorCode::AccountDisabled),
            1008 => Ok(ErrorCode::PasswordTooShort),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::StaffRequired),
            2004 => Ok(ErrorCode::SuperadminRequired),
            2005 => Ok(ErrorCode::ClientOutOfScope),

            // Client
            3001 => Ok(ErrorCode::ClientNotFound),
            3002 => Ok(ErrorCode::ClientInactive),
            3003 => Ok(ErrorCode::ClientHasDependents),
            3004 => Ok(ErrorCode::ClientHasNoAccount),
            3005 => Ok(ErrorCode::ClientInvalidManager),

            // Package
            4001 => Ok(ErrorCode::PackageNotFound),
            4002 => Ok(ErrorCode::PackageTrackingExists),
            4003 => Ok(ErrorCode::PackageNotReceived),
            4004 => Ok(ErrorCode::PackageAlreadyBoxed),
            4005 => Ok(ErrorCode::PackageClientMismatch),
            4006 => Ok(ErrorCode::PackageInvalidWeight),

            // Box
            5001 => Ok(ErrorCode::BoxNotFound),
            5002 => Ok(ErrorCode::BoxClosed),
            5003 => Ok(ErrorCode::BoxNotClosed),
            5004 => Ok(ErrorCode::BoxEmpty),
            5005 => Ok(ErrorCode::BoxNotEmpty),
            5006 => Ok(ErrorCode::BoxInShipment),
            5007 => Ok(ErrorCode::BoxItemNotFound),

            // Shipment
            6001 => Ok(ErrorCode::ShipmentNotFound),
            6002 => Ok(ErrorCode::ShipmentNotOpen),
            6003 => Ok(ErrorCode::ShipmentMixedCountry),
            6004 => Ok(ErrorCode::ShipmentMixedType),
            6005 => Ok(ErrorCode::ShipmentEmpty),
            6006 => Ok(ErrorCode::ShipmentInvalidTransition),

            // Invoice
            7001 => Ok(ErrorCode::InvoiceNotFound),
            7002 => Ok(ErrorCode::InvoiceNotEditable),
            7003 => Ok(ErrorCode::InvoiceInvalidTransition),
            7004 => Ok(ErrorCode::InvoiceEmpty),
            7005 => Ok(ErrorCode::InvoiceAlreadyPaid),
            7006 => Ok(ErrorCode::InvoiceNotOpen),
            7007 => Ok(ErrorCode::PaymentSetupFailed),

            // User / Alert
            8001 => Ok(ErrorCode::UserNotFound),
            8002 => Ok(ErrorCode::UserEmailExists),
            8003 => Ok(ErrorCode::UserCannotModifySelf),
            8101 => Ok(ErrorCode::AlertNotFound),
            8102 => Ok(ErrorCode::AlertAlreadyOpen),
            8103 => Ok(ErrorCode::AlertNotOpen),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
