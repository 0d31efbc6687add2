/// Role and ownership checks
///
/// Cashiers can create catalogue rows and edit the ones they created;
/// admins can edit anything and manage users.

use uuid::Uuid;

use super::middleware::AuthContext;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("This action requires an admin")]
    AdminRequired,

    #[error("Only the creator or an admin can change this record")]
    NotOwner,

    #[error("You cannot delete your own account")]
    SelfDeletion,
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.is_admin() {
        return Err(AuthzError::AdminRequired);
    }
    Ok(())
}

/// Passes for admins and for the user recorded as the row's creator
///
/// Rows whose creator was deleted (`created_by` is NULL) are admin-only.
pub fn require_owner_or_admin(auth: &AuthContext, created_by: Option<Uuid>) -> Result<(), AuthzError> {
    if auth.is_admin() || created_by == Some(auth.user_id) {
        return Ok(());
    }
    Err(AuthzError::NotOwner)
}

pub fn forbid_self(auth: &AuthContext, target_user_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == target_user_id {
        return Err(AuthzError::SelfDeletion);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status::UserRole;

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&context(UserRole::Admin)).is_ok());
        assert_eq!(
            require_admin(&context(UserRole::Cashier)),
            Err(AuthzError::AdminRequired)
        );
    }

    #[test]
    fn test_require_owner_or_admin() {
        let cashier = context(UserRole::Cashier);
        assert!(require_owner_or_admin(&cashier, Some(cashier.user_id)).is_ok());
        assert_eq!(
            require_owner_or_admin(&cashier, Some(Uuid::new_v4())),
            Err(AuthzError::NotOwner)
        );
        assert_eq!(require_owner_or_admin(&cashier, None), Err(AuthzError::NotOwner));

        let admin = context(UserRole::Admin);
        assert!(require_owner_or_admin(&admin, Some(Uuid::new_v4())).is_ok());
        assert!(require_owner_or_admin(&admin, None).is_ok());
    }

    #[test]
    fn test_forbid_self() {
        let admin = context(UserRole::Admin);
        assert_eq!(forbid_self(&admin, admin.user_id), Err(AuthzError::SelfDeletion));
        assert!(forbid_self(&admin, Uuid::new_v4()).is_ok());
    }
}
