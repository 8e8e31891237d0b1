//! Database access layer
//!
//! One module per collection. Multi-row operations run in a single
//! transaction, lock the rows they touch with `FOR UPDATE` and validate with
//! the pure rules from `shared::models` before writing.

pub mod alerts;
pub mod audit;
pub mod boxes;
pub mod clients;
pub mod counters;
pub mod invoices;
pub mod packages;
pub mod shipments;
pub mod users;
pub mod webhook_events;

/// Default and maximum page sizes for list queries
pub const DEFAULT_LIMIT: i64 = 200;
pub const MAX_LIMIT: i64 = 1000;
/// Row cap for CSV exports
pub const EXPORT_LIMIT: i64 = 50_000;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
