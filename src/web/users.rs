//! Public member profiles

use axum::{
    extract::{Path, State},
    response::Html,
};

use crate::{
    error::AppResult,
    views::{render, PageContext, ProfilePage},
    AppState,
};

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let profile = state.services.account.profile(id).await?;
    let books = state.services.books.list_by_owner(profile.id).await?;
    let is_self = ctx.user.as_ref().is_some_and(|u| u.id == profile.id);

    render(ProfilePage {
        ctx,
        profile,
        books,
        is_self,
    })
}
