//! Inbox, threads and sending

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::{
    error::AppResult,
    models::message::SendMessageForm,
    services::messages::Inbox,
    session::Session,
    views::{render, FormState, InboxPage, PageContext},
    AppState,
};

use super::{redirect_back, CsrfForm, CurrentUser};

/// Conversation list, or the member directory when there is none
pub async fn inbox(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ctx: PageContext,
) -> AppResult<Html<String>> {
    let (conversations, directory) = match state.services.messages.inbox(&user).await? {
        Inbox::Conversations(conversations) => (conversations, Vec::new()),
        Inbox::Directory(users) => (Vec::new(), users),
    };

    render(InboxPage {
        ctx,
        me: user.id,
        conversations,
        directory,
        partner: None,
        thread: Vec::new(),
        form: FormState::default(),
    })
}

/// Open the thread with a member; their messages are marked as read
pub async fn thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(partner_id): Path<i32>,
    session: Session,
    mut ctx: PageContext,
) -> AppResult<Html<String>> {
    let thread = state.services.messages.open_thread(&user, partner_id).await?;
    // The badge was computed before the thread got marked as read
    ctx.unread_count = state.services.messages.unread_total(user.id).await?;

    render(InboxPage {
        ctx,
        me: user.id,
        conversations: thread.conversations,
        directory: Vec::new(),
        partner: Some(thread.partner),
        thread: thread.messages,
        form: FormState::take(&session, "message"),
    })
}

pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(partner_id): Path<i32>,
    session: Session,
    CsrfForm(form): CsrfForm<SendMessageForm>,
) -> AppResult<Response> {
    let back = format!("/messages/{}", partner_id);
    let old_content = form.content.clone();

    match state.services.messages.send(&user, partner_id, form).await {
        Ok(_) => Ok(Redirect::to(&back).into_response()),
        Err(e) => redirect_back(&session, "message", &back, e, &[("content", old_content.as_str())]),
    }
}
