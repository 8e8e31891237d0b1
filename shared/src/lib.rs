//! Shared types for the freight portal
//!
//! Domain models, pure business rules, the unified error system and
//! formatting helpers used by portal-server and its API consumers.

pub mod csv;
pub mod error;
pub mod models;
pub mod search;
pub mod util;

pub use error::{ApiResponse, AppError, ErrorCode};
