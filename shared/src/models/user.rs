//! User Model

use serde::{Deserialize, Serialize};

use super::role::Role;

/// User response (without password)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub role: Role,
    /// Linked client account (only for `client` role)
    pub client_id: Option<i64>,
    pub active: bool,
    pub created_at: i64,
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub client_id: Option<i64>,
}

/// Visibility of a caller over client-owned data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Staff: every client
    All,
    /// Partner admin: clients whose `manager_uid` is this user id
    Managed(i64),
    /// Client user: a single client account
    Client(i64),
    /// Authenticated but bound to nothing
    Nothing,
}

impl Scope {
    pub fn for_role(role: Role, user_id: i64, client_id: Option<i64>) -> Self {
        match role {
            Role::Superadmin | Role::Admin | Role::Operador => Scope::All,
            Role::PartnerAdmin => Scope::Managed(user_id),
            Role::Client => client_id.map(Scope::Client).unwrap_or(Scope::Nothing),
        }
    }

    /// Whether a client with the given id and manager is visible.
    pub fn allows(&self, client_id: i64, manager_uid: Option<i64>) -> bool {
        match self {
            Scope::All => true,
            Scope::Managed(uid) => manager_uid == Some(*uid),
            Scope::Client(id) => *id == client_id,
            Scope::Nothing => false,
        }
    }

    /// SQL-friendly split: (manager filter, client filter). `Nothing`
    /// returns a client filter no row can match.
    pub fn filters(&self) -> (Option<i64>, Option<i64>) {
        match self {
            Scope::All => (None, None),
            Scope::Managed(uid) => (Some(*uid), None),
            Scope::Client(id) => (None, Some(*id)),
            Scope::Nothing => (None, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_for_role() {
        assert_eq!(Scope::for_role(Role::Operador, 1, None), Scope::All);
        assert_eq!(Scope::for_role(Role::PartnerAdmin, 9, None), Scope::Managed(9));
        assert_eq!(Scope::for_role(Role::Client, 3, Some(77)), Scope::Client(77));
        assert_eq!(Scope::for_role(Role::Client, 3, None), Scope::Nothing);
    }

    #[test]
    fn test_scope_allows() {
        assert!(Scope::All.allows(1, None));
        assert!(Scope::Managed(9).allows(1, Some(9)));
        assert!(!Scope::Managed(9).allows(1, Some(8)));
        assert!(!Scope::Managed(9).allows(1, None));
        assert!(Scope::Client(5).allows(5, Some(9)));
        assert!(!Scope::Client(5).allows(6, None));
        assert!(!Scope::Nothing.allows(5, None));
    }

    #[test]
    fn test_scope_filters() {
        assert_eq!(Scope::All.filters(), (None, None));
        assert_eq!(Scope::Managed(4).filters(), (Some(4), None));
        assert_eq!(Scope::Client(2).filters(), (None, Some(2)));
        assert_eq!(Scope::Nothing.filters(), (None, Some(0)));
    }
}
