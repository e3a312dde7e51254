//! Business logic services

pub mod account;
pub mod admin;
pub mod auth;
pub mod books;
pub mod messages;
pub mod uploads;

use crate::{
    config::{AppSection, UploadsConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub account: account::AccountService,
    pub books: books::BooksService,
    pub messages: messages::MessagesService,
    pub admin: admin::AdminService,
    pub uploads: uploads::UploadService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, app: &AppSection, uploads_config: UploadsConfig) -> Self {
        let uploads = uploads::UploadService::new(uploads_config);
        Self {
            auth: auth::AuthService::new(repository.clone(), &app.admin_emails),
            account: account::AccountService::new(repository.clone(), uploads.clone()),
            books: books::BooksService::new(repository.clone(), uploads.clone()),
            messages: messages::MessagesService::new(repository.clone()),
            admin: admin::AdminService::new(repository.clone()),
            uploads,
            repository,
        }
    }
}
