//! User model and related types

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{Decode, Encode, FromRow, Postgres};
use validator::Validate;

use crate::validation::PSEUDO_REGEX;

/// Placeholder shown for users without an avatar
pub const DEFAULT_AVATAR: &str = "/assets/default-avatar.svg";

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as text)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    // Column is VARCHAR
    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Lowercase and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim a pseudo; case is preserved for display
pub fn normalize_pseudo(pseudo: &str) -> String {
    pseudo.trim().to_string()
}

/// Full user model from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub pseudo: String,
    pub email: String,
    /// Hashed password (argon2)
    pub password: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn avatar_url(&self) -> &str {
        self.avatar.as_deref().unwrap_or(DEFAULT_AVATAR)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn member_since(&self) -> String {
        self.created_at.format("%d/%m/%Y").to_string()
    }
}

/// Short user representation for lists and directories
#[derive(Debug, Clone, FromRow)]
pub struct UserShort {
    pub id: i32,
    pub pseudo: String,
    pub avatar: Option<String>,
}

impl UserShort {
    pub fn avatar_url(&self) -> &str {
        self.avatar.as_deref().unwrap_or(DEFAULT_AVATAR)
    }
}

/// User row for the admin listing
#[derive(Debug, Clone, FromRow)]
pub struct UserAdminRow {
    pub id: i32,
    pub pseudo: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub book_count: i64,
}

impl UserAdminRow {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn created_label(&self) -> String {
        self.created_at.format("%d/%m/%Y").to_string()
    }
}

/// Validated data for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub pseudo: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(pseudo: &str, email: &str, password_hash: String) -> Self {
        Self {
            pseudo: normalize_pseudo(pseudo),
            email: normalize_email(email),
            password_hash,
            role: Role::User,
        }
    }

    pub fn with_role(self, role: Role) -> Self {
        Self { role, ..self }
    }
}

/// Registration form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = 3, max = 50, message = "Pseudo must be between 3 and 50 characters"),
        regex(path = *PSEUDO_REGEX, message = "Pseudo may only contain letters, digits, '.', '-' and '_'")
    )]
    pub pseudo: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl RegisterForm {
    /// Trim user-typed fields before validation
    pub fn normalized(self) -> Self {
        Self {
            pseudo: normalize_pseudo(&self.pseudo),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

/// Login form
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Own account update form; an empty password keeps the current one
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAccountForm {
    #[validate(
        length(min = 3, max = 50, message = "Pseudo must be between 3 and 50 characters"),
        regex(path = *PSEUDO_REGEX, message = "Pseudo may only contain letters, digits, '.', '-' and '_'")
    )]
    pub pseudo: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl UpdateAccountForm {
    pub fn normalized(self) -> Self {
        Self {
            pseudo: normalize_pseudo(&self.pseudo),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }

    pub fn new_password(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes() {
        let user = NewUser::new("  Alice ", " Alice@Example.COM ", "hash".to_string());
        assert_eq!(user.pseudo, "Alice");
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn test_register_form_validation() {
        let form = RegisterForm {
            pseudo: "al".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("pseudo"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_register_form_accepts_valid_input() {
        let form = RegisterForm {
            pseudo: " bookworm ".to_string(),
            email: " Reader@Example.org".to_string(),
            password: "correct horse".to_string(),
        }
        .normalized();
        assert!(form.validate().is_ok());
        assert_eq!(form.email, "reader@example.org");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_update_form_empty_password_is_none() {
        let form = UpdateAccountForm {
            pseudo: "bookworm".to_string(),
            email: "a@b.fr".to_string(),
            password: String::new(),
        };
        assert_eq!(form.new_password(), None);
    }
}
