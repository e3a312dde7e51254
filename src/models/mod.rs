//! Data models for Bookswap

pub mod book;
pub mod message;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookForm, BookInput, BookQuery, BookStatus};
pub use message::{Conversation, Message, SendMessageForm};
pub use stats::SiteStats;
pub use user::{NewUser, Role, User, UserAdminRow, UserShort};
