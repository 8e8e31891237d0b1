//! Portal server configuration

use crate::BoxError;

/// Portal server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for portal sessions
    pub jwt_secret: String,
    /// Session lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Public base URL, used for checkout success/cancel redirects
    pub portal_base_url: String,
    /// First superadmin, created at startup when none exists
    pub bootstrap_superadmin: Option<(String, String)>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let bootstrap_superadmin = match (
            std::env::var("BOOTSTRAP_SUPERADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            std::env::var("BOOTSTRAP_SUPERADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            portal_base_url: std::env::var("PORTAL_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            bootstrap_superadmin,
        })
    }

    pub fn checkout_success_url(&self, invoice_id: i64) -> String {
        format!("{}/invoices/{invoice_id}?paid=1", self.portal_base_url)
    }

    pub fn checkout_cancel_url(&self, invoice_id: i64) -> String {
        format!("{}/invoices/{invoice_id}", self.portal_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_secret_dev_fallback() {
        let val = Config::require_secret("PORTAL_TEST_UNSET_SECRET", "development").unwrap();
        assert_eq!(val, "dev-PORTAL_TEST_UNSET_SECRET-not-for-production");
    }

    #[test]
    fn test_require_secret_missing_in_production() {
        let err = Config::require_secret("PORTAL_TEST_UNSET_SECRET", "production").unwrap_err();
        assert!(err.to_string().contains("must be set"));
    }

    #[test]
    fn test_checkout_urls() {
        let config = Config {
            database_url: String::new(),
            http_port: 8080,
            environment: "development".into(),
            jwt_secret: "s".into(),
            jwt_expiry_hours: 24,
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            portal_base_url: "https://portal.example.com".into(),
            bootstrap_superadmin: None,
        };
        assert_eq!(
            config.checkout_success_url(7),
            "https://portal.example.com/invoices/7?paid=1"
        );
        assert_eq!(
            config.checkout_cancel_url(7),
            "https://portal.example.com/invoices/7"
        );
    }
}
