//! Own-account management: profile fields and avatar

use validator::Validate;

use super::{
    auth::hash_password,
    uploads::{UploadKind, UploadService, UploadedFile},
};
use crate::{
    error::{AppError, AppResult},
    models::user::{UpdateAccountForm, User},
    repository::Repository,
    validation::FieldErrors,
};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub struct AccountService {
    repository: Repository,
    uploads: UploadService,
}

impl AccountService {
    pub fn new(repository: Repository, uploads: UploadService) -> Self {
        Self { repository, uploads }
    }

    /// Update pseudo, email and optionally the password
    pub async fn update(&self, user: &User, form: UpdateAccountForm) -> AppResult<User> {
        let form = form.normalized();

        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };
        if let Some(password) = form.new_password() {
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                errors.add("password", "Password must be at least 8 characters");
            }
        }
        errors.into_result()?;

        let mut errors = FieldErrors::new();
        if self.repository.users.pseudo_exists(&form.pseudo, Some(user.id)).await? {
            errors.add("pseudo", "This pseudo is already taken");
        }
        if self.repository.users.email_exists(&form.email, Some(user.id)).await? {
            errors.add("email", "An account already exists with this email");
        }
        errors.into_result()?;

        let password_hash = match form.new_password() {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let updated = self
            .repository
            .users
            .update_account(user.id, &form.pseudo, &form.email, password_hash.as_deref())
            .await?;

        tracing::info!(user_id = user.id, password_changed = password_hash.is_some(), "Account updated");
        Ok(updated)
    }

    /// Replace the avatar; the previous file is removed once the new path is saved
    pub async fn update_avatar(&self, user: &User, file: &UploadedFile) -> AppResult<String> {
        let path = self.uploads.store(UploadKind::Avatar, file).await?;
        self.repository.users.update_avatar(user.id, &path).await?;
        self.uploads.remove(user.avatar.as_deref()).await;
        Ok(path)
    }

    /// Public profile: the user and their books
    pub async fn profile(&self, user_id: i32) -> AppResult<User> {
        let user = self.repository.users.get_by_id(user_id).await?;
        if !user.is_active {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        Ok(user)
    }
}
