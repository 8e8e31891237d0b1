//! Data models
//!
//! Shared between portal-server and API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes; status enums are stored as TEXT.

pub mod client;
pub mod invoice;
pub mod package;
pub mod role;
pub mod shipment;
pub mod shipping_box;
pub mod tracking_alert;
pub mod user;

// Re-exports
pub use client::*;
pub use invoice::*;
pub use package::*;
pub use role::*;
pub use shipment::*;
pub use shipping_box::*;
pub use tracking_alert::*;
pub use user::*;

/// A TEXT column held a value no status enum recognises.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status value: {0}")]
pub struct UnknownStatus(pub String);
