//! Administration: dashboard counters and moderation toggles

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookStatus},
        stats::SiteStats,
        user::{User, UserAdminRow},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AdminService {
    repository: Repository,
}

impl AdminService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn stats(&self) -> AppResult<SiteStats> {
        self.repository.stats.site_stats().await
    }

    pub async fn users(&self) -> AppResult<Vec<UserAdminRow>> {
        self.repository.users.list_for_admin().await
    }

    pub async fn books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list_all().await
    }

    /// Suspend or reactivate an account; admins cannot suspend themselves
    pub async fn toggle_user(&self, admin: &User, user_id: i32) -> AppResult<User> {
        if admin.id == user_id {
            return Err(AppError::BadRequest("You cannot suspend your own account".to_string()));
        }

        let user = self.repository.users.get_by_id(user_id).await?;
        let is_active = !user.is_active;
        self.repository.users.set_active(user_id, is_active).await?;

        tracing::info!(admin_id = admin.id, user_id, is_active, "User activity toggled");
        Ok(User { is_active, ..user })
    }

    /// Switch a book between available and unavailable
    pub async fn toggle_book(&self, admin: &User, book_id: i32) -> AppResult<BookStatus> {
        let book = self.repository.books.get_by_id(book_id).await?;
        let status = book.status.toggled();
        self.repository.books.set_status(book_id, status).await?;

        tracing::info!(admin_id = admin.id, book_id, status = %status, "Book status toggled");
        Ok(status)
    }
}
