//! Route table and middleware stack

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::{error::AppError, session::middleware::session_layer, web, AppState};

/// Room left for the other multipart fields around the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.uploads.max_bytes + MULTIPART_OVERHEAD);

    let pages = Router::new()
        .route("/", get(web::home::index))
        // Authentication
        .route("/register", get(web::auth::register_form).post(web::auth::register))
        .route("/login", get(web::auth::login_form).post(web::auth::login))
        .route("/logout", post(web::auth::logout))
        // Own account
        .route("/account", get(web::account::show).post(web::account::update))
        .route(
            "/account/avatar",
            post(web::account::upload_avatar).layer(upload_limit.clone()),
        )
        .route("/users/:id", get(web::users::show))
        // Books
        .route("/books", get(web::books::index).post(web::books::create))
        .route("/books/new", get(web::books::new_form))
        .route("/books/:id", get(web::books::show).post(web::books::update))
        .route("/books/:id/edit", get(web::books::edit_form))
        .route("/books/:id/delete", post(web::books::delete))
        .route(
            "/books/:id/image",
            post(web::books::upload_image).layer(upload_limit),
        )
        // Messages
        .route("/messages", get(web::messages::inbox))
        .route("/messages/:user_id", get(web::messages::thread).post(web::messages::send))
        // Administration
        .route("/admin", get(web::admin::dashboard))
        .route("/admin/users", get(web::admin::users))
        .route("/admin/users/:id/toggle", post(web::admin::toggle_user))
        .route("/admin/books", get(web::admin::books))
        .route("/admin/books/:id/toggle", post(web::admin::toggle_book))
        // Static pages
        .route("/pages/:slug", get(web::pages::show))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_layer));

    Router::new()
        .route("/health", get(web::health::health_check))
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .nest_service("/assets", ServeDir::new("assets"))
        .merge(pages)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("The page you are looking for does not exist.".to_string())
}
