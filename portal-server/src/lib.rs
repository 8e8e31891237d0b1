//! portal-server: freight forwarding administration backend
//!
//! Long-running service that:
//! - Registers clients and their inbound packages
//! - Consolidates packages into boxes and boxes into shipments
//! - Bills clients with invoices, paid through Stripe Checkout
//! - Tracks client-announced tracking numbers until intake
//!
//! Access is role-based: staff see everything, partner admins see the clients
//! they manage, client users see their own account.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod stripe;
pub mod util;

pub use config::Config;
pub use state::AppState;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Security event log, emitted on the `security` target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::warn!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
