//! Server-side sessions addressed by an opaque cookie.
//!
//! A [`Session`] handle is inserted into every request by [`middleware::session_layer`].
//! Handlers read and write plain values, queue flash entries that survive exactly
//! one read, and check the per-session CSRF token. The layer persists the record
//! when it changed and rotates or destroys the id on request.

pub mod middleware;
pub mod store;

use std::{collections::HashMap, sync::Arc};

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use rand::RngCore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

pub use store::{MemorySessionStore, RedisSessionStore, SessionStore};

const USER_ID_KEY: &str = "user_id";
const CSRF_KEY: &str = "csrf_token";
const MESSAGES_KEY: &str = "messages";

/// Random 32-byte identifier, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Persisted session record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    values: HashMap<String, Value>,
    /// Entries removed on first read
    #[serde(default)]
    flash: HashMap<String, Value>,
}

impl SessionData {
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.values.insert(key.to_string(), v);
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flash.is_empty()
    }
}

/// Severity of a flash message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
            FlashKind::Info => "info",
        }
    }
}

/// A notification shown once after a redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub text: String,
}

#[derive(Debug, Default)]
struct SessionState {
    data: SessionData,
    dirty: bool,
    rotate: bool,
    destroyed: bool,
}

/// What the layer must do with the record once the handler returns
#[derive(Debug)]
pub(crate) struct SessionOutcome {
    pub data: SessionData,
    pub dirty: bool,
    pub rotate: bool,
    pub destroyed: bool,
}

/// Request-scoped handle on the current session
#[derive(Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                data,
                ..Default::default()
            })),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.lock().data.get(key)
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: T) {
        let mut state = self.inner.lock();
        state.data.set(key, value);
        state.dirty = true;
    }

    pub fn remove(&self, key: &str) {
        let mut state = self.inner.lock();
        if state.data.remove(key) {
            state.dirty = true;
        }
    }

    /// Store a value readable exactly once, typically after a redirect
    pub fn flash<T: Serialize>(&self, key: &str, value: T) {
        let mut state = self.inner.lock();
        if let Ok(v) = serde_json::to_value(value) {
            state.data.flash.insert(key.to_string(), v);
            state.dirty = true;
        }
    }

    /// Read and discard a flash value
    pub fn take_flash<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut state = self.inner.lock();
        let value = state.data.flash.remove(key)?;
        state.dirty = true;
        serde_json::from_value(value).ok()
    }

    /// Queue a user-facing notification for the next rendered page
    pub fn push_message(&self, kind: FlashKind, text: impl Into<String>) {
        let mut messages: Vec<FlashMessage> = {
            let state = self.inner.lock();
            state
                .data
                .flash
                .get(MESSAGES_KEY)
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default()
        };
        messages.push(FlashMessage {
            kind,
            text: text.into(),
        });
        self.flash(MESSAGES_KEY, messages);
    }

    pub fn take_messages(&self) -> Vec<FlashMessage> {
        self.take_flash(MESSAGES_KEY).unwrap_or_default()
    }

    pub fn user_id(&self) -> Option<i32> {
        self.get(USER_ID_KEY)
    }

    /// Bind the session to a user and issue a fresh id and CSRF token
    pub fn login(&self, user_id: i32) {
        let mut state = self.inner.lock();
        state.data.set(USER_ID_KEY, user_id);
        state.data.set(CSRF_KEY, generate_token());
        state.dirty = true;
        state.rotate = true;
    }

    pub fn logout(&self) {
        self.remove(USER_ID_KEY);
    }

    /// Drop the record and clear the cookie
    pub fn destroy(&self) {
        let mut state = self.inner.lock();
        state.data = SessionData::default();
        state.destroyed = true;
    }

    /// Current CSRF token, created on first use
    pub fn csrf_token(&self) -> String {
        let mut state = self.inner.lock();
        if let Some(token) = state.data.get::<String>(CSRF_KEY) {
            return token;
        }
        let token = generate_token();
        state.data.set(CSRF_KEY, &token);
        state.dirty = true;
        token
    }

    pub fn verify_csrf(&self, submitted: &str) -> bool {
        match self.get::<String>(CSRF_KEY) {
            Some(expected) => constant_time_eq(expected.as_bytes(), submitted.as_bytes()),
            None => false,
        }
    }

    pub(crate) fn finish(&self) -> SessionOutcome {
        let state = self.inner.lock();
        SessionOutcome {
            data: state.data.clone(),
            dirty: state.dirty,
            rotate: state.rotate,
            destroyed: state.destroyed,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_is_read_once() {
        let session = Session::default();
        session.flash("notice", "Saved");

        assert_eq!(session.take_flash::<String>("notice").as_deref(), Some("Saved"));
        assert_eq!(session.take_flash::<String>("notice"), None);
    }

    #[test]
    fn test_flash_survives_persistence_until_read() {
        let session = Session::default();
        session.push_message(FlashKind::Success, "Book added");
        session.push_message(FlashKind::Error, "Second");

        // Next request sees the persisted record
        let next = Session::new(session.finish().data);
        let messages = next.take_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "Book added");
        assert_eq!(messages[1].kind, FlashKind::Error);

        let after = Session::new(next.finish().data);
        assert!(after.take_messages().is_empty());
    }

    #[test]
    fn test_csrf_token_is_stable_and_verified() {
        let session = Session::default();
        let token = session.csrf_token();
        assert_eq!(token.len(), 64);
        assert_eq!(session.csrf_token(), token);
        assert!(session.verify_csrf(&token));
        assert!(!session.verify_csrf("forged"));
        assert!(!session.verify_csrf(""));
    }

    #[test]
    fn test_csrf_fails_without_token() {
        let session = Session::default();
        assert!(!session.verify_csrf("anything"));
    }

    #[test]
    fn test_login_rotates_and_renews_csrf() {
        let session = Session::default();
        let before = session.csrf_token();
        session.login(42);

        let outcome = session.finish();
        assert!(outcome.rotate);
        assert!(outcome.dirty);
        assert_eq!(session.user_id(), Some(42));
        assert_ne!(session.csrf_token(), before);
    }

    #[test]
    fn test_destroy_clears_data() {
        let session = Session::default();
        session.login(1);
        session.destroy();

        let outcome = session.finish();
        assert!(outcome.destroyed);
        assert!(outcome.data.is_empty());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_reading_does_not_dirty() {
        let mut data = SessionData::default();
        data.set("user_id", 3);
        let session = Session::new(data);

        assert_eq!(session.user_id(), Some(3));
        assert!(!session.finish().dirty);
    }

    #[test]
    fn test_generate_token_is_random() {
        assert_ne!(generate_token(), generate_token());
    }
}
