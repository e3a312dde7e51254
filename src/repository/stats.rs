//! Site-wide counters

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::stats::SiteStats};

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn site_stats(&self) -> AppResult<SiteStats> {
        let stats = sqlx::query_as::<_, SiteStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE is_active) AS active_users,
                (SELECT COUNT(*) FROM books) AS books,
                (SELECT COUNT(*) FROM books WHERE status = 'available') AS available_books,
                (SELECT COUNT(*) FROM messages) AS messages,
                (SELECT COUNT(*) FROM messages WHERE read_at IS NULL) AS unread_messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
