//! Site-wide counters for the admin dashboard

use sqlx::FromRow;

#[derive(Debug, Clone, Default, FromRow)]
pub struct SiteStats {
    pub users: i64,
    pub active_users: i64,
    pub books: i64,
    pub available_books: i64,
    pub messages: i64,
    pub unread_messages: i64,
}
