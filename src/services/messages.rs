//! Direct messaging service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        message::{Conversation, Message, SendMessageForm},
        user::{User, UserShort},
    },
    repository::Repository,
};

/// What the inbox shows
#[derive(Debug, Clone)]
pub enum Inbox {
    Conversations(Vec<Conversation>),
    /// No conversation yet: other members to start one with
    Directory(Vec<UserShort>),
}

/// An opened conversation
#[derive(Debug, Clone)]
pub struct Thread {
    pub partner: User,
    pub messages: Vec<Message>,
    pub conversations: Vec<Conversation>,
}

#[derive(Clone)]
pub struct MessagesService {
    repository: Repository,
}

impl MessagesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn inbox(&self, user: &User) -> AppResult<Inbox> {
        let conversations = self.repository.messages.conversations(user.id).await?;
        if conversations.is_empty() {
            let users = self.repository.users.list_others(user.id).await?;
            return Ok(Inbox::Directory(users));
        }
        Ok(Inbox::Conversations(conversations))
    }

    /// Open the thread with `partner_id`, marking their messages as read first
    pub async fn open_thread(&self, user: &User, partner_id: i32) -> AppResult<Thread> {
        let partner = self.partner(user, partner_id).await?;

        let marked = self.repository.messages.mark_read(partner.id, user.id).await?;
        if marked > 0 {
            tracing::debug!(user_id = user.id, partner_id, marked, "Messages marked as read");
        }

        let messages = self.repository.messages.thread(user.id, partner.id).await?;
        let conversations = self.repository.messages.conversations(user.id).await?;

        Ok(Thread {
            partner,
            messages,
            conversations,
        })
    }

    pub async fn send(&self, user: &User, partner_id: i32, form: SendMessageForm) -> AppResult<Message> {
        let partner = self.partner(user, partner_id).await?;

        let form = form.normalized();
        if let Err(e) = form.validate() {
            return Err(AppError::Validation(e.into()));
        }

        let message = self
            .repository
            .messages
            .create(user.id, partner.id, &form.content)
            .await?;

        tracing::info!(message_id = message.id, sender_id = user.id, receiver_id = partner.id, "Message sent");
        Ok(message)
    }

    pub async fn unread_total(&self, user_id: i32) -> AppResult<i64> {
        self.repository.messages.unread_total(user_id).await
    }

    async fn partner(&self, user: &User, partner_id: i32) -> AppResult<User> {
        if partner_id == user.id {
            return Err(AppError::BadRequest("You cannot message yourself".to_string()));
        }
        let partner = self.repository.users.get_by_id(partner_id).await?;
        if !partner.is_active {
            return Err(AppError::NotFound(format!("User with id {} not found", partner_id)));
        }
        Ok(partner)
    }
}
