//! Administration pages

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
};

use crate::{
    error::AppResult,
    session::{FlashKind, Session},
    views::{render, AdminBooksPage, AdminDashboardPage, AdminUsersPage, PageContext},
    AppState,
};

use super::{AdminUser, CsrfForm, NoFields};

pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let stats = state.services.admin.stats().await?;
    render(AdminDashboardPage { ctx, stats })
}

pub async fn users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let users = state.services.admin.users().await?;
    render(AdminUsersPage { ctx, users })
}

pub async fn toggle_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    session: Session,
    CsrfForm(_): CsrfForm<NoFields>,
) -> AppResult<Redirect> {
    let user = state.services.admin.toggle_user(&admin, id).await?;
    let text = if user.is_active {
        format!("{} has been reactivated.", user.pseudo)
    } else {
        format!("{} has been suspended.", user.pseudo)
    };
    session.push_message(FlashKind::Success, text);
    Ok(Redirect::to("/admin/users"))
}

pub async fn books(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let books = state.services.admin.books().await?;
    render(AdminBooksPage { ctx, books })
}

pub async fn toggle_book(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    session: Session,
    CsrfForm(_): CsrfForm<NoFields>,
) -> AppResult<Redirect> {
    let status = state.services.admin.toggle_book(&admin, id).await?;
    session.push_message(FlashKind::Success, format!("Book marked as {}.", status.label().to_lowercase()));
    Ok(Redirect::to("/admin/books"))
}
