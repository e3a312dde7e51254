//! Static informational pages

use axum::{extract::Path, response::Html};

use crate::{
    error::{AppError, AppResult},
    views::{render, AboutPage, LegalPage, PageContext, PrivacyPage},
};

pub async fn show(Path(slug): Path<String>, ctx: PageContext) -> AppResult<Html<String>> {
    match slug.as_str() {
        "about" => render(AboutPage { ctx }),
        "legal" => render(LegalPage { ctx }),
        "privacy" => render(PrivacyPage { ctx }),
        _ => Err(AppError::NotFound(format!("No page named {}", slug))),
    }
}
