//! Messages repository: direct messages and inbox aggregation

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::message::{Conversation, Message},
};

#[derive(Clone)]
pub struct MessagesRepository {
    pool: Pool<Postgres>,
}

impl MessagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// One row per active conversation partner of `user_id`, latest exchange first.
    ///
    /// Messages are grouped by the unordered (sender, receiver) pair; the
    /// highest id in each group is its latest message. The unread count only
    /// covers messages sent by the partner to `user_id`. Suspended partners
    /// are left out since their thread can no longer be opened.
    pub async fn conversations(&self, user_id: i32) -> AppResult<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            WITH latest AS (
                SELECT MAX(id) AS id
                FROM messages
                GROUP BY LEAST(sender_id, receiver_id), GREATEST(sender_id, receiver_id)
            ),
            threads AS (
                SELECT m.*,
                       CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS partner_id
                FROM latest l
                JOIN messages m ON m.id = l.id
                WHERE m.sender_id = $1 OR m.receiver_id = $1
            )
            SELECT t.partner_id,
                   u.pseudo AS partner_pseudo,
                   u.avatar AS partner_avatar,
                   t.content AS last_message,
                   t.created_at AS last_message_at,
                   (
                       SELECT COUNT(*)
                       FROM messages un
                       WHERE un.sender_id = t.partner_id
                         AND un.receiver_id = $1
                         AND un.read_at IS NULL
                   ) AS unread_count
            FROM threads t
            JOIN users u ON u.id = t.partner_id
            WHERE u.is_active
            ORDER BY t.created_at DESC, t.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    /// Every message exchanged between two users, oldest first
    pub async fn thread(&self, user_id: i32, partner_id: i32) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at, read_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Mark every unread message from `sender_id` to `receiver_id` as read
    pub async fn mark_read(&self, sender_id: i32, receiver_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE sender_id = $1 AND receiver_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Store a new message
    pub async fn create(&self, sender_id: i32, receiver_id: i32, content: &str) -> AppResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, sender_id, receiver_id, content, created_at, read_at
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    /// Total unread messages addressed to `user_id` by active senders
    pub async fn unread_total(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.receiver_id = $1 AND m.read_at IS NULL AND u.is_active
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
