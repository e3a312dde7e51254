//! Direct message model and conversation summaries

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use validator::Validate;

use super::user::DEFAULT_AVATAR;

/// Maximum length of a message body, in characters
pub const MAX_MESSAGE_LENGTH: u64 = 2000;

/// Message model from database
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Takes a reference so templates can pass their fields directly
    pub fn is_from(&self, user_id: &i32) -> bool {
        self.sender_id == *user_id
    }

    pub fn sent_label(&self) -> String {
        self.created_at.format("%d/%m %H:%M").to_string()
    }
}

/// One inbox row: the latest exchange with a partner plus the unread badge
#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub partner_id: i32,
    pub partner_pseudo: String,
    pub partner_avatar: Option<String>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    /// Messages from the partner to the current user not yet read
    pub unread_count: i64,
}

impl Conversation {
    pub fn partner_avatar_url(&self) -> &str {
        self.partner_avatar.as_deref().unwrap_or(DEFAULT_AVATAR)
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    pub fn last_message_label(&self) -> String {
        self.last_message_at.format("%d/%m %H:%M").to_string()
    }

    /// First 60 characters of the last message
    pub fn preview(&self) -> String {
        const MAX: usize = 60;
        if self.last_message.chars().count() <= MAX {
            return self.last_message.clone();
        }
        let cut: String = self.last_message.chars().take(MAX).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Send message form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageForm {
    #[validate(length(min = 1, max = MAX_MESSAGE_LENGTH, message = "A message must contain between 1 and 2000 characters"))]
    pub content: String,
}

impl SendMessageForm {
    pub fn normalized(self) -> Self {
        Self {
            content: self.content.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn conversation(last_message: &str, unread_count: i64) -> Conversation {
        Conversation {
            partner_id: 1,
            partner_pseudo: "alice".to_string(),
            partner_avatar: None,
            last_message: last_message.to_string(),
            last_message_at: Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap(),
            unread_count,
        }
    }

    #[test]
    fn test_blank_message_is_rejected() {
        let form = SendMessageForm {
            content: "   \n ".to_string(),
        }
        .normalized();
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_message_length_limit() {
        let ok = SendMessageForm {
            content: "a".repeat(MAX_MESSAGE_LENGTH as usize),
        };
        assert!(ok.validate().is_ok());

        let too_long = SendMessageForm {
            content: "a".repeat(MAX_MESSAGE_LENGTH as usize + 1),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_conversation_helpers() {
        let conv = conversation("Bonjour", 1);
        assert!(conv.has_unread());
        assert_eq!(conv.preview(), "Bonjour");
        assert_eq!(conv.last_message_label(), "01/03 14:30");
        assert_eq!(conv.partner_avatar_url(), DEFAULT_AVATAR);

        let long = conversation(&"x".repeat(100), 0);
        assert!(!long.has_unread());
        assert_eq!(long.preview().chars().count(), 61);
    }
}
