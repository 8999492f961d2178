use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub phone: Option<String>,
    /// Roles as stored. `ROLE_USER` is implied even when absent, see [`User::roles`].
    pub stored_roles: Vec<String>,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Stored roles plus the implied `ROLE_USER`, without duplicates.
    pub fn roles(&self) -> Vec<String> {
        let mut roles = self.stored_roles.clone();
        if !roles.iter().any(|r| r == ROLE_USER) {
            roles.push(ROLE_USER.to_string());
        }
        roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        role == ROLE_USER || self.stored_roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

// Roles live in a JSON text column; anything unparsable counts as no extra roles.
impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let roles_json: String = row.try_get("roles")?;
        let stored_roles = serde_json::from_str::<Vec<String>>(&roles_json).unwrap_or_default();

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            surname: row.try_get("surname")?,
            phone: row.try_get("phone")?,
            stored_roles,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fields for a new user row. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub password_hash: String,
}

/// Public profile returned by `/api/me` and the login-adjacent endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: user.roles(),
            created_at: user.created_at,
        }
    }
}
