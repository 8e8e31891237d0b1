//! Role Model
//!
//! Portal roles, privilege ordering and effective-role resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Portal role
///
/// Declaration order is privilege order, lowest first, so `Ord` compares
/// privilege directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    PartnerAdmin,
    Operador,
    Admin,
    Superadmin,
}

/// Unknown role string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Client,
        Role::PartnerAdmin,
        Role::Operador,
        Role::Admin,
        Role::Superadmin,
    ];

    /// Database / token string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::PartnerAdmin => "partner_admin",
            Self::Operador => "operador",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Self::Client),
            "partner_admin" => Some(Self::PartnerAdmin),
            "operador" => Some(Self::Operador),
            "admin" => Some(Self::Admin),
            "superadmin" => Some(Self::Superadmin),
            _ => None,
        }
    }

    /// Staff roles see every client
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Operador | Self::Admin | Self::Superadmin)
    }

    pub fn is_superadmin(&self) -> bool {
        matches!(self, Self::Superadmin)
    }

    /// Roles this role may hand out when creating or editing accounts.
    pub fn can_assign(&self, target: Role) -> bool {
        match self {
            Self::Superadmin => true,
            Self::Admin => matches!(
                target,
                Role::Operador | Role::PartnerAdmin | Role::Client
            ),
            Self::PartnerAdmin => matches!(target, Role::Client),
            Self::Operador | Self::Client => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or(UnknownRole(value))
    }
}

/// Reconcile the role carried by an auth token with the role stored on the
/// user row.
///
/// Tokens outlive role changes, so the stored row wins for least privilege:
/// a stored `partner_admin` always applies, and when both sides are known the
/// lower of the two is used. A missing side defers to the other; with neither
/// the caller is treated as a plain client.
pub fn resolve_effective_role(claim: Option<Role>, stored: Option<Role>) -> Role {
    match (claim, stored) {
        (_, Some(Role::PartnerAdmin)) => Role::PartnerAdmin,
        (Some(claim), Some(stored)) => claim.min(stored),
        (Some(role), None) | (None, Some(role)) => role,
        (None, None) => Role::Client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_partner_admin_overrides_stale_admin_claim() {
        assert_eq!(
            resolve_effective_role(Some(Role::Admin), Some(Role::PartnerAdmin)),
            Role::PartnerAdmin
        );
        assert_eq!(
            resolve_effective_role(Some(Role::Superadmin), Some(Role::PartnerAdmin)),
            Role::PartnerAdmin
        );
    }

    #[test]
    fn test_least_privilege_wins() {
        assert_eq!(
            resolve_effective_role(Some(Role::Admin), Some(Role::Operador)),
            Role::Operador
        );
        // A promotion only applies once a fresh token is issued
        assert_eq!(
            resolve_effective_role(Some(Role::Client), Some(Role::Admin)),
            Role::Client
        );
    }

    #[test]
    fn test_missing_sides() {
        assert_eq!(resolve_effective_role(Some(Role::Admin), None), Role::Admin);
        assert_eq!(
            resolve_effective_role(None, Some(Role::Operador)),
            Role::Operador
        );
        assert_eq!(resolve_effective_role(None, None), Role::Client);
    }

    #[test]
    fn test_parse_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse(" Partner_Admin "), Some(Role::PartnerAdmin));
        assert_eq!(Role::parse("owner"), None);
        assert!(Role::try_from("nobody".to_string()).is_err());
    }

    #[test]
    fn test_staff_and_assignment() {
        assert!(Role::Operador.is_staff());
        assert!(!Role::PartnerAdmin.is_staff());
        assert!(Role::Superadmin.can_assign(Role::Superadmin));
        assert!(!Role::Admin.can_assign(Role::Admin));
        assert!(Role::Admin.can_assign(Role::PartnerAdmin));
        assert!(Role::PartnerAdmin.can_assign(Role::Client));
        assert!(!Role::Operador.can_assign(Role::Client));
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Role::PartnerAdmin).unwrap();
        assert_eq!(json, "\"partner_admin\"");
    }
}
