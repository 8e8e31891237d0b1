//! Authentication and authorization
//!
//! Every protected handler takes a [`CurrentUser`]. The extractor validates
//! the bearer token, re-reads the user row and reconciles the token's role
//! with the stored one through [`resolve_effective_role`], so a demoted
//! account loses its privileges on the next request instead of at token
//! expiry.

pub mod extractor;
pub mod jwt;
pub mod rate_limit;

use shared::error::{AppError, ErrorCode};
use shared::models::{Client, Role, Scope, resolve_effective_role};

use crate::security_log;

pub use jwt::Claims;

/// Authentication-relevant columns of a user row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthRow {
    pub role: String,
    pub active: bool,
    pub client_id: Option<i64>,
}

/// Authenticated caller with its effective role and data scope
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub client_id: Option<i64>,
    pub scope: Scope,
}

impl CurrentUser {
    /// Combine token claims with the live user row.
    pub fn resolve(claims: &Claims, stored: Option<&AuthRow>) -> Result<Self, AppError> {
        let id = claims
            .user_id()
            .ok_or_else(|| AppError::invalid_token("Malformed subject claim"))?;
        let row = stored.ok_or_else(|| {
            AppError::with_message(ErrorCode::NotAuthenticated, "Account no longer exists")
        })?;
        if !row.active {
            return Err(AppError::new(ErrorCode::AccountDisabled));
        }

        let role = resolve_effective_role(claims.role(), Role::parse(&row.role));
        let client_id = row.client_id;

        Ok(Self {
            id,
            email: claims.email.clone(),
            role,
            client_id,
            scope: Scope::for_role(role, id, client_id),
        })
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if !self.is_staff() {
            security_log!("WARN", "staff_required", user_id = self.id, role = self.role.as_str());
            return Err(AppError::new(ErrorCode::StaffRequired));
        }
        Ok(())
    }

    pub fn require_superadmin(&self) -> Result<(), AppError> {
        if !self.role.is_superadmin() {
            security_log!(
                "WARN",
                "superadmin_required",
                user_id = self.id,
                role = self.role.as_str()
            );
            return Err(AppError::new(ErrorCode::SuperadminRequired));
        }
        Ok(())
    }

    /// Staff or partner admin
    pub fn require_manager(&self) -> Result<(), AppError> {
        if !(self.is_staff() || self.role == Role::PartnerAdmin) {
            security_log!("WARN", "manager_required", user_id = self.id, role = self.role.as_str());
            return Err(AppError::new(ErrorCode::RoleRequired));
        }
        Ok(())
    }

    /// The caller may read data of this client.
    pub fn ensure_client_visible(&self, client: &Client) -> Result<(), AppError> {
        if !self.scope.allows(client.id, client.manager_uid) {
            security_log!(
                "WARN",
                "client_out_of_scope",
                user_id = self.id,
                client_id = client.id
            );
            return Err(AppError::new(ErrorCode::ClientOutOfScope).with_detail("client_id", client.id));
        }
        Ok(())
    }

    /// The caller may edit this client: staff, or the partner that manages it.
    pub fn ensure_client_manageable(&self, client: &Client) -> Result<(), AppError> {
        let allowed = self.is_staff()
            || (self.role == Role::PartnerAdmin && client.manager_uid == Some(self.id));
        if !allowed {
            security_log!(
                "WARN",
                "client_not_manageable",
                user_id = self.id,
                client_id = client.id
            );
            return Err(AppError::new(ErrorCode::ClientOutOfScope).with_detail("client_id", client.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, client_id: Option<i64>) -> Claims {
        Claims {
            sub: "7".into(),
            email: "u@example.com".into(),
            role: role.into(),
            client_id,
            iss: "portal-server".into(),
            exp: 0,
            iat: 0,
        }
    }

    fn row(role: &str, active: bool, client_id: Option<i64>) -> AuthRow {
        AuthRow {
            role: role.into(),
            active,
            client_id,
        }
    }

    fn client(id: i64, manager_uid: Option<i64>) -> Client {
        Client {
            id,
            code: 1,
            name: "Acme".into(),
            email: None,
            phone: None,
            country: "VE".into(),
            state: None,
            city: None,
            address: None,
            postal_code: None,
            document_type: None,
            document_number: None,
            manager_uid,
            activo: true,
            search_tokens: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_stale_admin_claim_demoted_to_partner() {
        let user =
            CurrentUser::resolve(&claims("admin", None), Some(&row("partner_admin", true, None)))
                .unwrap();
        assert_eq!(user.role, Role::PartnerAdmin);
        assert_eq!(user.scope, Scope::Managed(7));
        assert!(user.require_staff().is_err());
    }

    #[test]
    fn test_client_scope_from_stored_row() {
        let user = CurrentUser::resolve(&claims("client", None), Some(&row("client", true, Some(30))))
            .unwrap();
        assert_eq!(user.scope, Scope::Client(30));
        assert!(user.ensure_client_visible(&client(30, None)).is_ok());
        assert_eq!(
            user.ensure_client_visible(&client(31, None)).unwrap_err().code,
            ErrorCode::ClientOutOfScope
        );
    }

    #[test]
    fn test_disabled_or_missing_account_rejected() {
        assert_eq!(
            CurrentUser::resolve(&claims("admin", None), Some(&row("admin", false, None)))
                .unwrap_err()
                .code,
            ErrorCode::AccountDisabled
        );
        assert_eq!(
            CurrentUser::resolve(&claims("admin", None), None).unwrap_err().code,
            ErrorCode::NotAuthenticated
        );
    }

    #[test]
    fn test_unparsable_stored_role_falls_back_to_claim() {
        let user =
            CurrentUser::resolve(&claims("operador", None), Some(&row("legacy", true, None)))
                .unwrap();
        assert_eq!(user.role, Role::Operador);
    }

    #[test]
    fn test_partner_manages_only_own_clients() {
        let partner = CurrentUser::resolve(
            &claims("partner_admin", None),
            Some(&row("partner_admin", true, None)),
        )
        .unwrap();
        assert!(partner.require_manager().is_ok());
        assert!(partner.ensure_client_manageable(&client(1, Some(7))).is_ok());
        assert!(partner.ensure_client_manageable(&client(1, Some(8))).is_err());
        assert!(partner.require_superadmin().is_err());
    }
}
