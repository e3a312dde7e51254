//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, User, UserAdminRow, UserShort},
};

const USER_COLUMNS: &str = "id, pseudo, email, password, avatar, role, is_active, created_at";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Find user by ID, `None` when missing
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get user by (normalized) email
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Check if pseudo already exists
    pub async fn pseudo_exists(&self, pseudo: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(pseudo) = LOWER($1) AND id != $2)")
                .bind(pseudo)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(pseudo) = LOWER($1))")
                .bind(pseudo)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create a new user
    pub async fn create(&self, user: &NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (pseudo, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.pseudo)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update pseudo, email and optionally the password hash
    pub async fn update_account(
        &self,
        id: i32,
        pseudo: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> AppResult<User> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET pseudo = $2, email = $3, password = COALESCE($4, password)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(pseudo)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        Ok(updated)
    }

    /// Replace the avatar path
    pub async fn update_avatar(&self, id: i32, path: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Active users other than `exclude_id`, for the new-conversation directory
    pub async fn list_others(&self, exclude_id: i32) -> AppResult<Vec<UserShort>> {
        let users = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT id, pseudo, avatar
            FROM users
            WHERE id != $1 AND is_active
            ORDER BY LOWER(pseudo)
            "#,
        )
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// All users with their book counts, newest first
    pub async fn list_for_admin(&self) -> AppResult<Vec<UserAdminRow>> {
        let users = sqlx::query_as::<_, UserAdminRow>(
            r#"
            SELECT u.id, u.pseudo, u.email, u.role, u.is_active, u.created_at,
                   (SELECT COUNT(*) FROM books b WHERE b.user_id = u.id) AS book_count
            FROM users u
            ORDER BY u.created_at DESC, u.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Suspend or reactivate an account
    pub async fn set_active(&self, id: i32, is_active: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;
    use crate::models::user::Role;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_and_read_back(pool: PgPool) {
        let users = UsersRepository::new(pool);
        let new_user = NewUser::new("  Reader ", "Reader@Example.org", "hash".to_string())
            .with_role(Role::Admin);

        let created = users.create(&new_user).await.unwrap();
        assert_eq!(created.pseudo, "Reader");
        assert_eq!(created.email, "reader@example.org");
        assert_eq!(created.role, Role::Admin);
        assert!(created.is_active);

        let by_email = users.get_by_email("READER@example.org").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(users.get_by_id(created.id).await.unwrap().role, Role::Admin);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_existence_checks_ignore_case_and_self(pool: PgPool) {
        let users = UsersRepository::new(pool);
        let created = users
            .create(&NewUser::new("reader", "reader@example.org", "hash".to_string()))
            .await
            .unwrap();

        assert!(users.pseudo_exists("READER", None).await.unwrap());
        assert!(users.email_exists("Reader@Example.org", None).await.unwrap());
        assert!(!users.pseudo_exists("reader", Some(created.id)).await.unwrap());
        assert!(!users.email_exists("reader@example.org", Some(created.id)).await.unwrap());
        assert!(!users.pseudo_exists("someone", None).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_pseudo_is_refused_by_index(pool: PgPool) {
        let users = UsersRepository::new(pool);
        users
            .create(&NewUser::new("reader", "one@example.org", "hash".to_string()))
            .await
            .unwrap();

        let duplicate = users
            .create(&NewUser::new("READER", "two@example.org", "hash".to_string()))
            .await;
        assert!(duplicate.is_err());
        assert_eq!(users.list_for_admin().await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_set_active_unknown_user(pool: PgPool) {
        let users = UsersRepository::new(pool);
        assert!(matches!(users.set_active(42, false).await, Err(AppError::NotFound(_))));
    }
}
