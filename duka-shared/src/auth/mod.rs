/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Access and refresh tokens
/// - [`middleware`]: Bearer-token parsing into an [`middleware::AuthContext`]
/// - [`authorization`]: Admin and ownership checks
///
/// # Example
///
/// ```no_run
/// use duka_shared::auth::jwt::issue_token_pair;
/// use duka_shared::auth::password::{hash_password, verify_password};
/// use duka_shared::models::status::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("till-password-1")?;
/// assert!(verify_password("till-password-1", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), UserRole::Cashier, "a-secret-that-is-at-least-32-bytes")?;
/// println!("{}", tokens.access_token);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
