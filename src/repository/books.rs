//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput, BookStatus},
};

/// Book columns joined with the owner's public fields
const BOOK_SELECT: &str = r#"
    SELECT b.id, b.user_id, b.title, b.author, b.description, b.status, b.image,
           b.created_at, b.updated_at,
           u.pseudo AS owner_pseudo, u.avatar AS owner_avatar
    FROM books b
    JOIN users u ON u.id = b.user_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Most recent available books of active users
    pub async fn latest_available(&self, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            {}
            WHERE b.status = 'available' AND u.is_active
            ORDER BY b.created_at DESC, b.id DESC
            LIMIT $1
            "#,
            BOOK_SELECT
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Books offered for exchange, optionally filtered on title or author
    pub async fn list_available(&self, search: Option<&str>) -> AppResult<Vec<Book>> {
        let pattern = search.map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            {}
            WHERE b.status = 'available' AND u.is_active
              AND ($1::TEXT IS NULL
                   OR LOWER(b.title) LIKE $1 ESCAPE '\'
                   OR LOWER(b.author) LIKE $1 ESCAPE '\')
            ORDER BY b.title, b.id
            "#,
            BOOK_SELECT
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Every book of one owner, any status
    pub async fn list_by_owner(&self, user_id: i32) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "{} WHERE b.user_id = $1 ORDER BY b.created_at DESC, b.id DESC",
            BOOK_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Every book, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "{} ORDER BY b.created_at DESC, b.id DESC",
            BOOK_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Create a book owned by `user_id`
    pub async fn create(&self, user_id: i32, input: &BookInput) -> AppResult<Book> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (user_id, title, author, description, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.description)
        .bind(input.status)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update the descriptive fields and status
    pub async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, description = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.description)
        .bind(input.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    /// Replace the cover image path
    pub async fn update_image(&self, id: i32, path: &str) -> AppResult<()> {
        sqlx::query("UPDATE books SET image = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set the availability status
    pub async fn set_status(&self, id: i32, status: BookStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE books SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}

/// Escape LIKE wildcards in user input
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
