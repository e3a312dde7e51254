//! Own account: profile, password, avatar and library

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;

use crate::{
    error::AppResult,
    models::user::UpdateAccountForm,
    session::{FlashKind, Session},
    views::{render, AccountPage, FormState, PageContext},
    AppState,
};

use super::{read_upload, redirect_back, CsrfForm, CurrentUser};

pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session: Session,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let books = state.services.books.list_by_owner(user.id).await?;
    let form = FormState::take(&session, "account");

    render(AccountPage {
        ctx,
        account: user,
        books,
        form,
        max_upload: state.services.uploads.max_size_label(),
    })
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session: Session,
    CsrfForm(form): CsrfForm<UpdateAccountForm>,
) -> AppResult<Response> {
    let old_pseudo = form.pseudo.clone();
    let old_email = form.email.clone();

    match state.services.account.update(&user, form).await {
        Ok(_) => {
            session.push_message(FlashKind::Success, "Your information has been updated.");
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => redirect_back(
            &session,
            "account",
            "/account",
            e,
            &[("pseudo", old_pseudo.as_str()), ("email", old_email.as_str())],
        ),
    }
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session: Session,
    multipart: Multipart,
) -> AppResult<Response> {
    let max_bytes = state.services.uploads.max_bytes();
    let result = match read_upload(&session, multipart, "avatar", max_bytes).await {
        Ok(file) => state.services.account.update_avatar(&user, &file).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => {
            session.push_message(FlashKind::Success, "Your avatar has been updated.");
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => redirect_back(&session, "account", "/account", e, &[]),
    }
}
