//! Client Model

use serde::{Deserialize, Serialize};

/// Client account profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Client {
    pub id: i64,
    /// Sequential display code
    pub code: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    /// Partner admin that owns this client
    pub manager_uid: Option<i64>,
    pub activo: bool,
    #[serde(skip_serializing)]
    #[cfg_attr(feature = "db", sqlx(default))]
    pub search_tokens: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create client payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCreate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    /// Only honoured for staff callers
    pub manager_uid: Option<i64>,
    /// Creates a `client` login for `email` when set
    pub password: Option<String>,
}

/// Update client payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    /// Only honoured for staff callers
    pub manager_uid: Option<i64>,
    /// Detach the client from its partner admin (staff only)
    #[serde(default)]
    pub clear_manager: bool,
}

/// Normalise a country to its upper-case code form.
pub fn normalize_country(country: &str) -> String {
    country.trim().to_uppercase()
}
