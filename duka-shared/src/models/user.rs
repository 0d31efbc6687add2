/// User model and database operations
///
/// Users are the shop staff: one or more admins plus cashiers. Passwords are
/// stored as Argon2id PHC strings and the hash is never serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'CASHIER',
///     banned BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ,
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use duka_shared::models::user::{CreateUser, User};
/// use duka_shared::models::status::UserRole;
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "Amina Wanjiru".to_string(),
///     email: "amina@duka.test".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Cashier,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "amina@duka.test").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status::UserRole;
use crate::pagination::{order_by, search_pattern, Page, PageRequest, SortField, SortOrder};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, banned, created_at, updated_at, last_login_at";

/// A staff account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Lower-cased, unique
    pub email: String,

    /// Argon2id hash, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: UserRole,

    /// Banned users cannot log in
    pub banned: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    /// Argon2id hash (not the plaintext password)
    pub password_hash: String,
    pub role: UserRole,
}

/// Fields an admin may change; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub password_hash: Option<String>,
    pub banned: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSort {
    Name,
    #[default]
    CreatedAt,
}

impl SortField for UserSort {
    fn column(&self) -> &'static str {
        match self {
            UserSort::Name => "name",
            UserSort::CreatedAt => "created_at",
        }
    }
}

/// Query string of `GET /v1/users`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Matches name or email
    pub search: Option<String>,
    pub sort_by: Option<UserSort>,
    pub sort_order: Option<SortOrder>,
}

impl User {
    /// Inserts a user with an explicit role
    ///
    /// # Errors
    ///
    /// Returns a unique-violation database error if the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.name)
            .bind(data.email.to_lowercase())
            .bind(data.password_hash)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    /// Inserts a self-registered user
    ///
    /// The very first account becomes `ADMIN`; every later one is a
    /// `CASHIER`. The role is decided inside the insert statement, under a
    /// transaction-scoped advisory lock so two simultaneous first
    /// registrations cannot both become admin.
    pub async fn register(
        pool: &PgPool,
        name: String,
        email: String,
        password_hash: String,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('duka_users_register'))")
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES (
                $1, $2, $3,
                CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'CASHIER' ELSE 'ADMIN' END::user_role
            )
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(email.to_lowercase())
            .bind(password_hash)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive lookup by email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Only the id for an email, used by the lookup endpoint
    pub async fn id_by_email(pool: &PgPool, email: &str) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Applies the non-`None` fields of `data`
    ///
    /// Returns `None` if the user does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash),
                banned = COALESCE($6, banned),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(data.name)
            .bind(data.email.map(|e| e.to_lowercase()))
            .bind(data.role)
            .bind(data.password_hash)
            .bind(data.banned)
            .fetch_optional(pool)
            .await
    }

    /// Returns true if a row was deleted
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The oldest account, which owns seeded reference data
    pub async fn first(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT 1");
        sqlx::query_as::<_, User>(&sql).fetch_optional(pool).await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// One page of users, newest first unless another sort is requested
    pub async fn list(pool: &PgPool, params: &UserListParams) -> Result<Page<Self>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);
        let pattern = search_pattern(params.search.as_deref());
        let order = order_by(
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or(SortOrder::Desc),
        );

        const FILTER: &str = "($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {FILTER}"))
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {FILTER} {order} LIMIT $2 OFFSET $3"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(&pattern)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(users, total, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Amina".to_string(),
            email: "amina@duka.test".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Cashier,
            banned: false,
            created_at: Utc::now(),
            updated_at: None,
            last_login_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "CASHIER");
    }

    #[test]
    fn test_user_sort_columns() {
        assert_eq!(UserSort::default(), UserSort::CreatedAt);
        assert_eq!(UserSort::Name.column(), "name");
    }
}
