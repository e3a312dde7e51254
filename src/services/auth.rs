//! Registration and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{normalize_email, LoginForm, NewUser, RegisterForm, Role, User},
    repository::Repository,
    validation::FieldErrors,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    admin_emails: Vec<String>,
}

impl AuthService {
    pub fn new(repository: Repository, admin_emails: &[String]) -> Self {
        Self {
            repository,
            admin_emails: admin_emails.iter().map(|e| normalize_email(e)).collect(),
        }
    }

    fn role_for(&self, email: &str) -> Role {
        if self.admin_emails.iter().any(|e| e == email) {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// Create an account; pseudo and email must not already be taken
    pub async fn register(&self, form: RegisterForm) -> AppResult<User> {
        let form = form.normalized();

        if let Err(e) = form.validate() {
            return Err(AppError::Validation(e.into()));
        }

        let mut errors = FieldErrors::new();
        if self.repository.users.pseudo_exists(&form.pseudo, None).await? {
            errors.add("pseudo", "This pseudo is already taken");
        }
        if self.repository.users.email_exists(&form.email, None).await? {
            errors.add("email", "An account already exists with this email");
        }
        errors.into_result()?;

        let new_user = NewUser::new(&form.pseudo, &form.email, hash_password(&form.password)?)
            .with_role(self.role_for(&form.email));
        let user = self.repository.users.create(&new_user).await?;

        tracing::info!(user_id = user.id, pseudo = %user.pseudo, role = %user.role, "User registered");
        Ok(user)
    }

    /// Check credentials; failures are reported on the `email` field
    pub async fn authenticate(&self, form: &LoginForm) -> AppResult<User> {
        let email = normalize_email(&form.email);

        let invalid = || {
            let mut errors = FieldErrors::new();
            errors.add("email", INVALID_CREDENTIALS);
            AppError::Validation(errors)
        };

        if email.is_empty() || form.password.is_empty() {
            return Err(invalid());
        }

        let user = self
            .repository
            .users
            .get_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&user.password, &form.password)? {
            tracing::info!(user_id = user.id, "Failed login attempt");
            return Err(invalid());
        }

        if !user.is_active {
            let mut errors = FieldErrors::new();
            errors.add("email", "This account has been suspended");
            return Err(AppError::Validation(errors));
        }

        tracing::info!(user_id = user.id, "User logged in");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "wrong horse").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "x").is_err());
    }

    #[tokio::test]
    async fn test_configured_emails_register_as_admin() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = AuthService::new(Repository::new(pool), &[" Root@Example.org ".to_string()]);

        assert_eq!(service.role_for("root@example.org"), Role::Admin);
        assert_eq!(service.role_for("reader@example.org"), Role::User);
    }
}
