//! Bookswap book exchange
//!
//! Server-rendered web application where members list the books they own,
//! browse other members' shelves and exchange direct messages.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;
pub mod session;
pub mod validation;
pub mod views;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub sessions: Arc<dyn session::SessionStore>,
}
