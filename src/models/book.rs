//! Book model and related types

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{Decode, Encode, FromRow, Postgres};
use validator::Validate;

use crate::validation::FieldErrors;

/// Placeholder cover for books without an image
pub const DEFAULT_COVER: &str = "/assets/default-book.svg";

/// Exchange availability of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookStatus {
    #[default]
    Available,
    Unavailable,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Unavailable => "unavailable",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Unavailable => "Not available",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            BookStatus::Available => BookStatus::Unavailable,
            BookStatus::Unavailable => BookStatus::Available,
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    /// Strict: only the two stored spellings are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BookStatus::Available),
            "unavailable" => Ok(BookStatus::Unavailable),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for BookStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    // Column is VARCHAR
    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for BookStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BookStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Book model from database, joined with its owner's public fields
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub author: String,
    pub description: String,
    pub status: BookStatus,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_pseudo: String,
    pub owner_avatar: Option<String>,
}

impl Book {
    pub fn image_url(&self) -> &str {
        self.image.as_deref().unwrap_or(DEFAULT_COVER)
    }

    pub fn owner_avatar_url(&self) -> &str {
        self.owner_avatar
            .as_deref()
            .unwrap_or(super::user::DEFAULT_AVATAR)
    }

    pub fn is_available(&self) -> bool {
        self.status == BookStatus::Available
    }

    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.user_id == user_id
    }

    /// First 120 characters of the description
    pub fn excerpt(&self) -> String {
        const MAX: usize = 120;
        if self.description.chars().count() <= MAX {
            return self.description.clone();
        }
        let cut: String = self.description.chars().take(MAX).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    /// Search in title and author
    pub q: Option<String>,
}

impl BookQuery {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Add/edit book form as submitted
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookForm {
    #[validate(length(min = 1, max = 255, message = "Title is required (255 characters max)"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author is required (255 characters max)"))]
    pub author: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description is limited to 5000 characters"))]
    pub description: String,
    #[serde(default)]
    pub status: String,
}

/// Validated book fields ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub description: String,
    pub status: BookStatus,
}

impl BookForm {
    /// Trim, validate and convert; any status other than
    /// `available`/`unavailable` is a field error
    pub fn into_input(self) -> Result<BookInput, FieldErrors> {
        let form = BookForm {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            description: self.description.trim().to_string(),
            status: self.status.trim().to_string(),
        };

        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        let status = form.status.parse::<BookStatus>();
        if status.is_err() {
            errors.add("status", "Status must be either available or unavailable");
        }

        match status {
            Ok(status) if errors.is_empty() => Ok(BookInput {
                title: form.title,
                author: form.author,
                description: form.description,
                status,
            }),
            _ => Err(errors),
        }
    }
}
