//! Registration, login and logout

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::AppResult,
    models::user::{LoginForm, RegisterForm},
    session::{FlashKind, Session},
    views::{render, FormState, LoginPage, PageContext, RegisterPage},
    AppState,
};

use super::{redirect_back, CsrfForm, MaybeUser, NoFields};

pub async fn register_form(
    MaybeUser(user): MaybeUser,
    session: Session,
    ctx: PageContext,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let form = FormState::take(&session, "register");
    Ok(render(RegisterPage { ctx, form })?.into_response())
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    CsrfForm(form): CsrfForm<RegisterForm>,
) -> AppResult<Response> {
    let old_pseudo = form.pseudo.clone();
    let old_email = form.email.clone();

    match state.services.auth.register(form).await {
        Ok(user) => {
            session.login(user.id);
            session.push_message(
                FlashKind::Success,
                format!("Welcome {}! Your account has been created.", user.pseudo),
            );
            Ok(Redirect::to("/account").into_response())
        }
        Err(e) => redirect_back(
            &session,
            "register",
            "/register",
            e,
            &[("pseudo", old_pseudo.as_str()), ("email", old_email.as_str())],
        ),
    }
}

pub async fn login_form(
    MaybeUser(user): MaybeUser,
    session: Session,
    ctx: PageContext,
) -> AppResult<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let form = FormState::take(&session, "login");
    Ok(render(LoginPage { ctx, form })?.into_response())
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    CsrfForm(form): CsrfForm<LoginForm>,
) -> AppResult<Response> {
    match state.services.auth.authenticate(&form).await {
        Ok(user) => {
            session.login(user.id);
            session.push_message(FlashKind::Success, format!("Welcome back, {}!", user.pseudo));
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => redirect_back(&session, "login", "/login", e, &[("email", form.email.as_str())]),
    }
}

/// Destroy the session; the cookie is cleared on the way out
pub async fn logout(session: Session, CsrfForm(_): CsrfForm<NoFields>) -> Redirect {
    session.destroy();
    Redirect::to("/")
}

