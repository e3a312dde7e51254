//! Session storage backends

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::{AsyncCommands, Client};

use super::SessionData;
use crate::error::{AppError, AppResult};

/// Persistence for session records, keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>>;

    /// Write the record and (re)arm its idle expiry
    async fn save(&self, id: &str, data: &SessionData, ttl_secs: u64) -> AppResult<()>;

    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Redis-backed sessions, stored as JSON under `session:{id}`
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
}

impl RedisSessionStore {
    /// Create a new Redis store and check the connection
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(Self::key(id))
            .await
            .map_err(|e| AppError::Session(format!("Failed to read session from Redis: {}", e)))?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(data) => Ok(Some(data)),
                Err(e) => {
                    tracing::warn!("Discarding unreadable session record: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let json = serde_json::to_string(data)
            .map_err(|e| AppError::Session(format!("Failed to serialize session: {}", e)))?;

        conn.set_ex::<_, _, ()>(Self::key(id), json, ttl_secs)
            .await
            .map_err(|e| AppError::Session(format!("Failed to store session in Redis: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;

        conn.del::<_, ()>(Self::key(id))
            .await
            .map_err(|e| AppError::Session(format!("Failed to delete session from Redis: {}", e)))?;

        Ok(())
    }
}

/// In-process sessions for development and tests; lost on restart
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.records
            .lock()
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> AppResult<Option<SessionData>> {
        let mut records = self.records.lock();
        match records.get(id) {
            Some((data, expires_at)) if *expires_at > Instant::now() => Ok(Some(data.clone())),
            Some(_) => {
                records.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Expired records are purged on every save so abandoned sessions do not pile up
    async fn save(&self, id: &str, data: &SessionData, ttl_secs: u64) -> AppResult<()> {
        let now = Instant::now();
        let mut records = self.records.lock();
        records.retain(|_, (_, expires_at)| *expires_at > now);
        records.insert(id.to_string(), (data.clone(), now + Duration::from_secs(ttl_secs)));
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.records.lock().remove(id);
        Ok(())
    }
}
