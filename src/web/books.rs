//! Book catalogue pages and owner actions

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;

use crate::{
    error::AppResult,
    models::book::{BookForm, BookQuery},
    session::{FlashKind, Session},
    views::{render, BookFormPage, BookPage, BooksPage, FormState, PageContext},
    AppState,
};

use super::{read_upload, redirect_back, CsrfForm, CurrentUser, NoFields};

/// Available books, optionally filtered by `q`
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let books = state.services.books.search(&query).await?;
    let query = query.search().unwrap_or_default().to_string();
    render(BooksPage { ctx, books, query })
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let book = state.services.books.get(id).await?;
    let is_owner = ctx.user.as_ref().is_some_and(|u| book.is_owned_by(u.id));
    render(BookPage { ctx, book, is_owner })
}

pub async fn new_form(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    session: Session,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    render(BookFormPage {
        ctx,
        book: None,
        form: FormState::take(&session, "book"),
        max_upload: state.services.uploads.max_size_label(),
    })
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session: Session,
    CsrfForm(form): CsrfForm<BookForm>,
) -> AppResult<Response> {
    let old = form.clone();

    match state.services.books.create(&user, form).await {
        Ok(book) => {
            session.push_message(FlashKind::Success, format!("\"{}\" has been added to your library.", book.title));
            Ok(Redirect::to(&format!("/books/{}", book.id)).into_response())
        }
        Err(e) => redirect_back(&session, "book", "/books/new", e, &old_input(&old)),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    session: Session,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let book = state.services.books.get_owned(&user, id).await?;

    render(BookFormPage {
        ctx,
        book: Some(book),
        form: FormState::take(&session, "book"),
        max_upload: state.services.uploads.max_size_label(),
    })
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    session: Session,
    CsrfForm(form): CsrfForm<BookForm>,
) -> AppResult<Response> {
    let old = form.clone();

    match state.services.books.update(&user, id, form).await {
        Ok(book) => {
            session.push_message(FlashKind::Success, "The book has been updated.");
            Ok(Redirect::to(&format!("/books/{}", book.id)).into_response())
        }
        Err(e) => redirect_back(&session, "book", &format!("/books/{}/edit", id), e, &old_input(&old)),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    session: Session,
    CsrfForm(_): CsrfForm<NoFields>,
) -> AppResult<Redirect> {
    state.services.books.delete(&user, id).await?;
    session.push_message(FlashKind::Success, "The book has been removed from your library.");
    Ok(Redirect::to("/account"))
}

pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Response> {
    let back = format!("/books/{}/edit", id);
    let max_bytes = state.services.uploads.max_bytes();
    let result = match read_upload(&session, multipart, "image", max_bytes).await {
        Ok(file) => state.services.books.update_image(&user, id, &file).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => {
            session.push_message(FlashKind::Success, "The cover has been updated.");
            Ok(Redirect::to(&back).into_response())
        }
        Err(e) => redirect_back(&session, "book", &back, e, &[]),
    }
}

fn old_input(form: &BookForm) -> [(&'static str, &str); 4] {
    [
        ("title", form.title.as_str()),
        ("author", form.author.as_str()),
        ("description", form.description.as_str()),
        ("status", form.status.as_str()),
    ]
}
