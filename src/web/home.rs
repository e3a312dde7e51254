//! Home page

use axum::{extract::State, response::Html};

use crate::{
    error::AppResult,
    views::{render, HomePage, PageContext},
    AppState,
};

/// Latest available books
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> AppResult<Html<String>> {
    let books = state.services.books.latest().await?;
    render(HomePage { ctx, books })
}
