//! Book catalogue service: listing, ownership rules, covers

use super::uploads::{UploadKind, UploadService, UploadedFile};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookForm, BookQuery},
        user::User,
    },
    repository::Repository,
};

/// Number of books on the home page
pub const LATEST_BOOKS: i64 = 4;

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    uploads: UploadService,
}

impl BooksService {
    pub fn new(repository: Repository, uploads: UploadService) -> Self {
        Self { repository, uploads }
    }

    pub async fn latest(&self) -> AppResult<Vec<Book>> {
        self.repository.books.latest_available(LATEST_BOOKS).await
    }

    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list_available(query.search()).await
    }

    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn list_by_owner(&self, user_id: i32) -> AppResult<Vec<Book>> {
        self.repository.books.list_by_owner(user_id).await
    }

    /// Load a book the user is allowed to modify
    pub async fn get_owned(&self, user: &User, id: i32) -> AppResult<Book> {
        let book = self.repository.books.get_by_id(id).await?;
        if !book.is_owned_by(user.id) {
            return Err(AppError::Forbidden("You can only manage your own books".to_string()));
        }
        Ok(book)
    }

    pub async fn create(&self, owner: &User, form: BookForm) -> AppResult<Book> {
        let input = form.into_input().map_err(AppError::Validation)?;
        let book = self.repository.books.create(owner.id, &input).await?;

        tracing::info!(book_id = book.id, user_id = owner.id, "Book added");
        Ok(book)
    }

    pub async fn update(&self, owner: &User, id: i32, form: BookForm) -> AppResult<Book> {
        self.get_owned(owner, id).await?;
        let input = form.into_input().map_err(AppError::Validation)?;
        self.repository.books.update(id, &input).await
    }

    /// Delete a book and its cover file
    pub async fn delete(&self, owner: &User, id: i32) -> AppResult<()> {
        let book = self.get_owned(owner, id).await?;
        self.repository.books.delete(id).await?;
        self.uploads.remove(book.image.as_deref()).await;

        tracing::info!(book_id = id, user_id = owner.id, "Book deleted");
        Ok(())
    }

    /// Replace the cover; the previous file is removed once the new path is saved
    pub async fn update_image(&self, owner: &User, id: i32, file: &UploadedFile) -> AppResult<String> {
        let book = self.get_owned(owner, id).await?;
        let path = self.uploads.store(UploadKind::BookCover, file).await?;
        self.repository.books.update_image(id, &path).await?;
        self.uploads.remove(book.image.as_deref()).await;
        Ok(path)
    }
}
