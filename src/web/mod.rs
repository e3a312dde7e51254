//! HTML controllers and the extractors they share

pub mod account;
pub mod admin;
pub mod auth;
pub mod books;
pub mod health;
pub mod home;
pub mod messages;
pub mod pages;
pub mod users;

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::Multipart;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::{AppError, AppResult},
    models::User,
    services::uploads::UploadedFile,
    session::{FlashKind, Session},
    views::{FormState, PageContext},
    AppState,
};

/// Name of the hidden CSRF field carried by every form
pub const CSRF_FIELD: &str = "_csrf";

/// User loaded once per request, shared by the extractors below
#[derive(Clone)]
struct CachedUser(Option<User>);

/// The logged-in user, if any
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(CachedUser(user)) = parts.extensions.get::<CachedUser>() {
            return Ok(MaybeUser(user.clone()));
        }

        let session = Session::from_request_parts(parts, state).await?;
        let user = match session.user_id() {
            Some(id) => match state.services.repository.users.find_by_id(id).await? {
                Some(user) if user.is_active => Some(user),
                // Deleted or suspended since login
                _ => {
                    session.logout();
                    None
                }
            },
            None => None,
        };

        parts.extensions.insert(CachedUser(user.clone()));
        Ok(MaybeUser(user))
    }
}

/// Extractor for routes reserved to logged-in users
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(CurrentUser(user)),
            MaybeUser(None) => {
                let session = Session::from_request_parts(parts, state).await?;
                session.push_message(FlashKind::Info, "Please log in to access this page.");
                Err(AppError::LoginRequired)
            }
        }
    }
}

/// Extractor for administration routes
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("This area is reserved to administrators".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        let session = Session::from_request_parts(parts, state).await?;

        let unread_count = match &user {
            Some(user) => state.services.messages.unread_total(user.id).await?,
            None => 0,
        };

        Ok(PageContext {
            app_name: state.config.app.name.clone(),
            user,
            csrf_token: session.csrf_token(),
            unread_count,
            session,
        })
    }
}

/// Url-encoded form whose `_csrf` field matched the session token
///
/// The token is checked before the fields are deserialized, so a forged
/// request is a 403 whatever its body, including bodies that are not forms.
pub struct CsrfForm<T>(pub T);

/// Body of forms that carry nothing but the CSRF token
#[derive(Debug, Default, Deserialize)]
pub struct NoFields {}

#[async_trait]
impl<T> FromRequest<AppState> for CsrfForm<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = req
            .extensions()
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))?;

        // A body that is not a url-encoded form cannot carry the token
        let mut fields = match Form::<HashMap<String, String>>::from_request(req, state).await {
            Ok(Form(fields)) => fields,
            Err(e) => {
                tracing::debug!("Unreadable form body: {}", e.body_text());
                HashMap::new()
            }
        };

        let token = fields.remove(CSRF_FIELD).unwrap_or_default();
        verify_csrf(&session, &token)?;

        let value = serde_json::to_value(fields)
            .map_err(|e| AppError::Internal(format!("Failed to buffer form: {}", e)))?;
        let form = serde_json::from_value(value).map_err(|e| AppError::BadRequest(format!("Invalid form: {}", e)))?;

        Ok(CsrfForm(form))
    }
}

fn verify_csrf(session: &Session, token: &str) -> AppResult<()> {
    if token.is_empty() || !session.verify_csrf(token) {
        tracing::warn!("Rejected request with missing or invalid CSRF token");
        return Err(AppError::Forbidden("Invalid or expired form token. Please try again.".to_string()));
    }
    Ok(())
}

/// Read the file part `field` of a multipart form and check its CSRF token
///
/// At most `max_bytes + 1` bytes are kept so that oversized files are
/// reported as such without being buffered whole.
pub async fn read_upload(
    session: &Session,
    mut multipart: Multipart,
    field: &str,
    max_bytes: usize,
) -> AppResult<UploadedFile> {
    let mut token = String::new();
    let mut file = UploadedFile {
        file_name: String::new(),
        bytes: Vec::new(),
    };

    while let Some(mut part) = multipart.next_field().await.map_err(unreadable_upload)? {
        let name = part.name().unwrap_or_default().to_string();
        if name == CSRF_FIELD {
            token = part.text().await.map_err(unreadable_upload)?;
        } else if name == field {
            file.file_name = part.file_name().unwrap_or_default().to_string();
            while let Some(chunk) = part.chunk().await.map_err(unreadable_upload)? {
                if file.bytes.len() <= max_bytes {
                    file.bytes.extend_from_slice(&chunk);
                }
            }
            file.bytes.truncate(max_bytes + 1);
        }
    }

    verify_csrf(session, &token)?;
    Ok(file)
}

fn unreadable_upload(e: axum_extra::extract::multipart::MultipartError) -> AppError {
    tracing::debug!("Multipart read failed: {}", e);
    AppError::Upload("The file could not be received. It may be too large.".to_string())
}

/// Post/Redirect/Get outcome of a form handler that failed validation or upload
///
/// Field errors are flashed with the prior input under `form`; upload
/// rejections become a single notification. Other errors pass through.
pub fn redirect_back(
    session: &Session,
    form: &str,
    to: &str,
    error: AppError,
    old: &[(&str, &str)],
) -> AppResult<Response> {
    match error {
        AppError::Validation(errors) => {
            let state = old
                .iter()
                .fold(FormState::new(errors), |state, (field, value)| state.with_old(field, value));
            state.flash(session, form);
            session.push_message(FlashKind::Error, "Please correct the errors below.");
            Ok(Redirect::to(to).into_response())
        }
        AppError::Upload(message) => {
            session.push_message(FlashKind::Error, message);
            Ok(Redirect::to(to).into_response())
        }
        other => Err(other),
    }
}
