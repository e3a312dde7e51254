//! Page templates and the data every page shares

use std::collections::BTreeMap;

use askama::Template;
use axum::response::Html;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{Book, Conversation, Message, SiteStats, User, UserAdminRow, UserShort},
    session::{FlashMessage, Session},
    validation::FieldErrors,
};

/// Layout data: current user, CSRF token, pending notifications, unread badge
#[derive(Clone, Default)]
pub struct PageContext {
    pub app_name: String,
    pub user: Option<User>,
    pub csrf_token: String,
    pub unread_count: i64,
    pub(crate) session: Session,
}

impl PageContext {
    /// Pending notifications, consumed only when the layout is rendered
    /// so that a redirect or an error page leaves them for the next page
    pub fn messages(&self) -> Vec<FlashMessage> {
        self.session.take_messages()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

/// Errors and prior input of a rejected form, carried across the redirect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormState {
    pub errors: FieldErrors,
    pub old: BTreeMap<String, String>,
}

impl FormState {
    pub fn new(errors: FieldErrors) -> Self {
        Self {
            errors,
            old: BTreeMap::new(),
        }
    }

    /// Remember a submitted value; never used for passwords
    pub fn with_old(mut self, field: &str, value: &str) -> Self {
        self.old.insert(field.to_string(), value.to_string());
        self
    }

    pub fn flash(self, session: &Session, form: &str) {
        session.flash(&flash_key(form), self);
    }

    pub fn take(session: &Session, form: &str) -> Self {
        session.take_flash(&flash_key(form)).unwrap_or_default()
    }

    pub fn error(&self, field: &str) -> &str {
        self.errors.get(field).unwrap_or("")
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.get(field).is_some()
    }

    pub fn old(&self, field: &str) -> &str {
        self.old.get(field).map(String::as_str).unwrap_or("")
    }

    /// Prior input when present, else `fallback`
    pub fn value<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
        self.old.get(field).map(String::as_str).unwrap_or(fallback)
    }
}

fn flash_key(form: &str) -> String {
    format!("form:{}", form)
}

pub fn render<T: Template>(page: T) -> AppResult<Html<String>> {
    Ok(Html(page.render()?))
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub ctx: PageContext,
    pub books: Vec<Book>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginPage {
    pub ctx: PageContext,
    pub form: FormState,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterPage {
    pub ctx: PageContext,
    pub form: FormState,
}

#[derive(Template)]
#[template(path = "account/show.html")]
pub struct AccountPage {
    pub ctx: PageContext,
    pub account: User,
    pub books: Vec<Book>,
    pub form: FormState,
    pub max_upload: String,
}

#[derive(Template)]
#[template(path = "users/profile.html")]
pub struct ProfilePage {
    pub ctx: PageContext,
    pub profile: User,
    pub books: Vec<Book>,
    pub is_self: bool,
}

#[derive(Template)]
#[template(path = "books/index.html")]
pub struct BooksPage {
    pub ctx: PageContext,
    pub books: Vec<Book>,
    pub query: String,
}

#[derive(Template)]
#[template(path = "books/show.html")]
pub struct BookPage {
    pub ctx: PageContext,
    pub book: Book,
    pub is_owner: bool,
}

/// Shared by the add and edit forms; `book` is set when editing
#[derive(Template)]
#[template(path = "books/form.html")]
pub struct BookFormPage {
    pub ctx: PageContext,
    pub book: Option<Book>,
    pub form: FormState,
    pub max_upload: String,
}

impl BookFormPage {
    pub fn action(&self) -> String {
        match &self.book {
            Some(book) => format!("/books/{}", book.id),
            None => "/books".to_string(),
        }
    }

    pub fn heading(&self) -> &'static str {
        if self.book.is_some() {
            "Edit book"
        } else {
            "Add a book"
        }
    }

    pub fn field(&self, name: &str) -> String {
        let current = self.book.as_ref().map(|book| match name {
            "title" => book.title.as_str(),
            "author" => book.author.as_str(),
            "description" => book.description.as_str(),
            "status" => book.status.as_str(),
            _ => "",
        });
        self.form.value(name, current.unwrap_or("")).to_string()
    }

    pub fn status_is(&self, status: &str) -> bool {
        let current = self.field("status");
        if current.is_empty() {
            status == "available"
        } else {
            current == status
        }
    }
}

/// Inbox and thread view; `partner` is set when a thread is open
#[derive(Template)]
#[template(path = "messages/inbox.html")]
pub struct InboxPage {
    pub ctx: PageContext,
    pub me: i32,
    pub conversations: Vec<Conversation>,
    pub directory: Vec<UserShort>,
    pub partner: Option<User>,
    pub thread: Vec<Message>,
    pub form: FormState,
}

impl InboxPage {
    pub fn is_active(&self, partner_id: &i32) -> bool {
        self.partner.as_ref().is_some_and(|p| p.id == *partner_id)
    }
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardPage {
    pub ctx: PageContext,
    pub stats: SiteStats,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct AdminUsersPage {
    pub ctx: PageContext,
    pub users: Vec<UserAdminRow>,
}

#[derive(Template)]
#[template(path = "admin/books.html")]
pub struct AdminBooksPage {
    pub ctx: PageContext,
    pub books: Vec<Book>,
}

#[derive(Template)]
#[template(path = "pages/about.html")]
pub struct AboutPage {
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "pages/legal.html")]
pub struct LegalPage {
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "pages/privacy.html")]
pub struct PrivacyPage {
    pub ctx: PageContext,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FlashKind;

    fn context() -> PageContext {
        PageContext {
            app_name: "Bookswap".to_string(),
            csrf_token: "token123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_state_survives_one_redirect() {
        let session = Session::default();
        let mut errors = FieldErrors::new();
        errors.add("email", "Invalid email address");
        FormState::new(errors).with_old("email", "nope").flash(&session, "register");

        let form = FormState::take(&session, "register");
        assert_eq!(form.error("email"), "Invalid email address");
        assert_eq!(form.old("email"), "nope");
        assert_eq!(form.old("password"), "");

        let again = FormState::take(&session, "register");
        assert!(!again.has_error("email"));
    }

    #[test]
    fn test_form_state_is_scoped_per_form() {
        let session = Session::default();
        FormState::default().with_old("pseudo", "bob").flash(&session, "register");
        assert_eq!(FormState::take(&session, "login").old("pseudo"), "");
        assert_eq!(FormState::take(&session, "register").old("pseudo"), "bob");
    }

    #[test]
    fn test_layout_renders_csrf_and_flash() {
        let ctx = context();
        ctx.session.push_message(FlashKind::Success, "Welcome <back>");
        let html = LoginPage {
            ctx,
            form: FormState::default(),
        }
        .render()
        .unwrap();

        assert!(html.contains("token123"));
        assert!(html.contains("Welcome &lt;back&gt;"));
        assert!(html.contains("flash-success"));
    }

    #[test]
    fn test_flash_kept_until_a_page_is_rendered() {
        let ctx = context();
        ctx.session.push_message(FlashKind::Info, "Please log in to access this page.");

        // Building the context alone must not consume the notification
        let again = ctx.clone();
        let html = LoginPage {
            ctx: again,
            form: FormState::default(),
        }
        .render()
        .unwrap();
        assert!(html.contains("Please log in to access this page."));
        assert!(ctx.messages().is_empty());
    }

    #[test]
    fn test_empty_inbox_shows_directory() {
        let html = InboxPage {
            ctx: context(),
            me: 1,
            conversations: Vec::new(),
            directory: vec![UserShort {
                id: 2,
                pseudo: "bob".to_string(),
                avatar: None,
            }],
            partner: None,
            thread: Vec::new(),
            form: FormState::default(),
        }
        .render()
        .unwrap();

        assert!(html.contains("No conversations yet"));
        assert!(html.contains("/messages/2"));
    }

    #[test]
    fn test_open_thread_marks_sides_and_active_partner() {
        use chrono::Utc;

        use crate::models::user::Role;

        let bob = User {
            id: 2,
            pseudo: "bob".to_string(),
            email: "bob@example.org".to_string(),
            password: String::new(),
            avatar: None,
            role: Role::User,
            is_active: true,
            created_at: Utc::now(),
        };
        let message = |id, sender_id, receiver_id, content: &str| Message {
            id,
            sender_id,
            receiver_id,
            content: content.to_string(),
            created_at: Utc::now(),
            read_at: None,
        };

        let html = InboxPage {
            ctx: context(),
            me: 1,
            conversations: vec![Conversation {
                partner_id: 2,
                partner_pseudo: "bob".to_string(),
                partner_avatar: None,
                last_message: "Salut".to_string(),
                last_message_at: Utc::now(),
                unread_count: 0,
            }],
            directory: Vec::new(),
            partner: Some(bob),
            thread: vec![message(1, 1, 2, "Bonjour"), message(2, 2, 1, "Salut")],
            form: FormState::default(),
        }
        .render()
        .unwrap();

        assert!(html.contains("<li class=\"active\">"));
        assert!(html.contains("<li class=\"sent\">"));
        assert!(html.contains("<li class=\"received\">"));
    }

    #[test]
    fn test_book_form_defaults_to_available() {
        let page = BookFormPage {
            ctx: context(),
            book: None,
            form: FormState::default(),
            max_upload: "2 MB".to_string(),
        };
        assert_eq!(page.action(), "/books");
        assert!(page.status_is("available"));
        assert!(!page.status_is("unavailable"));
    }
}
