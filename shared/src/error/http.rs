//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::ClientNotFound
            | Self::PackageNotFound
            | Self::BoxNotFound
            | Self::BoxItemNotFound
            | Self::ShipmentNotFound
            | Self::InvoiceNotFound
            | Self::UserNotFound
            | Self::AlertNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::ClientHasDependents
            | Self::PackageTrackingExists
            | Self::PackageAlreadyBoxed
            | Self::BoxNotEmpty
            | Self::BoxInShipment
            | Self::InvoiceAlreadyPaid
            | Self::UserEmailExists
            | Self::AlertAlreadyOpen => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::AccountDisabled => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied
            | Self::RoleRequired
            | Self::StaffRequired
            | Self::SuperadminRequired
            | Self::ClientOutOfScope
            | Self::UserCannotModifySelf => StatusCode::FORBIDDEN,

            // 429 Too Many Requests
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,

            // 502 Bad Gateway (Stripe rejected the request)
            Self::PaymentSetupFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::BoxNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ShipmentNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::BoxNotEmpty.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::BoxInShipment.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PackageTrackingExists.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::SuperadminRequired.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::ClientOutOfScope.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::TooManyAttempts.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_bad_request_status() {
        // Business rule violations default to 400
        assert_eq!(
            ErrorCode::ShipmentMixedCountry.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::BoxClosed.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InvoiceNotEditable.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::PaymentSetupFailed.http_status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
