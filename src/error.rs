//! Error types for Bookswap server

use std::sync::atomic::{AtomicBool, Ordering};

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::validation::FieldErrors;

static SHOW_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Toggle the developer view of 500 pages (error details in the body)
pub fn show_error_details(enabled: bool) {
    SHOW_ERROR_DETAILS.store(enabled, Ordering::Relaxed);
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Login required")]
    LoginRequired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Template)]
#[template(path = "errors/error.html")]
struct ErrorPage {
    status: u16,
    title: &'static str,
    message: String,
    detail: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::LoginRequired => StatusCode::SEE_OTHER,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_)
            | AppError::Io(_)
            | AppError::Template(_)
            | AppError::Session(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (title, message) = match &self {
            AppError::LoginRequired => return Redirect::to("/login").into_response(),
            AppError::Forbidden(msg) => ("Access denied", msg.clone()),
            AppError::NotFound(msg) => ("Page not found", msg.clone()),
            AppError::BadRequest(msg) | AppError::Upload(msg) => ("Bad request", msg.clone()),
            AppError::Validation(errors) => ("Bad request", errors.summary()),
            _ => {
                tracing::error!(error = %self, "Internal error while handling request");
                (
                    "Server error",
                    "Something went wrong on our side. Please try again later.".to_string(),
                )
            }
        };

        let detail = (status.is_server_error() && SHOW_ERROR_DETAILS.load(Ordering::Relaxed))
            .then(|| format!("{:?}", self));

        let page = ErrorPage {
            status: status.as_u16(),
            title,
            message,
            detail,
        };

        match page.render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, title).into_response()
            }
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
