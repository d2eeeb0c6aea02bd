//! Desk user model and credential checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};
use crate::utils::verify_password;

/// Access level of a desk user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserLevel {
    L1,
    L2,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl UserLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            "ADMIN" => Ok(Self::Admin),
            other => Err(AppError::Validation(format!("Unknown user level '{other}'"))),
        }
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User row as stored in `users`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: i64,
    pub uid: String,
    pub name: String,
    pub level: String,
    pub team_id: Option<i64>,
    pub password_salt: String,
    pub password_hash: String,
    pub is_active: bool,
}

/// A user whose credentials were verified for the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub uid: String,
    pub name: String,
    pub level: UserLevel,
    pub team_id: Option<i64>,
}

impl AuthenticatedUser {
    pub const fn is_admin(&self) -> bool {
        matches!(self.level, UserLevel::Admin)
    }

    /// Team filter for visibility queries: `None` means every team.
    ///
    /// Non-admin users without a team get `Some(None)`: they see nothing.
    pub const fn team_scope(&self) -> Option<Option<i64>> {
        if self.is_admin() {
            None
        } else {
            Some(self.team_id)
        }
    }

    /// Returns true when the user may read and write items of `team_id`.
    pub fn can_access_team(&self, team_id: i64) -> bool {
        self.is_admin() || self.team_id == Some(team_id)
    }
}

impl TryFrom<User> for AuthenticatedUser {
    type Error = AppError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(Self {
            level: user.level.parse()?,
            user_id: user.user_id,
            uid: user.uid,
            name: user.name,
            team_id: user.team_id,
        })
    }
}

/// User repository.
pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_uid(pool: &sqlx::PgPool, uid: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT user_id, uid, name, level, team_id, password_salt, password_hash, is_active
            FROM users
            WHERE uid = $1
            LIMIT 1
            ",
        )
        .bind(uid)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Verifies `uid`/`password` and returns the authenticated user.
    ///
    /// Unknown users, inactive users and wrong passwords all yield the same
    /// `Unauthorized` message.
    pub async fn authenticate(
        pool: &sqlx::PgPool,
        uid: &str,
        password: &str,
    ) -> AppResult<AuthenticatedUser> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let user = Self::find_by_uid(pool, uid).await?.ok_or_else(invalid)?;
        check_credentials(&user, password)?;

        tracing::debug!(uid = %user.uid, level = %user.level, "User authenticated");
        user.try_into()
    }
}

/// Checks an already loaded user against the supplied password.
pub fn check_credentials(user: &User, password: &str) -> AppResult<()> {
    if !user.is_active || !verify_password(&user.password_salt, password, &user.password_hash) {
        tracing::warn!(uid = %user.uid, "Rejected credentials");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }
    Ok(())
}
