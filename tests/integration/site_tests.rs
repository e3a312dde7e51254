//! End-to-end tests against a running server backed by a fresh database
//!
//! Run with: cargo test --test integration -- --ignored

use reqwest::{multipart, Client, StatusCode};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080";
const PASSWORD: &str = "correct horse battery";

/// A browser with its own cookie jar
struct Visitor {
    client: Client,
}

impl Visitor {
    fn new() -> Self {
        Self {
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to build client"),
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        (status, response.text().await.expect("Failed to read body"))
    }

    /// CSRF token embedded in the page at `path`
    async fn csrf(&self, path: &str) -> String {
        let (_, html) = self.get(path).await;
        extract(&html, "name=\"_csrf\" value=\"", "\"").expect("No CSRF field in page")
    }

    /// Submit a form from `page`; redirects are followed.
    /// Returns the final status, path and body.
    async fn submit(&self, page: &str, action: &str, fields: &[(&str, &str)]) -> (StatusCode, String, String) {
        let token = self.csrf(page).await;
        let mut form: Vec<(&str, &str)> = vec![("_csrf", token.as_str())];
        form.extend_from_slice(fields);

        let response = self
            .client
            .post(format!("{}{}", BASE_URL, action))
            .form(&form)
            .send()
            .await
            .expect("Failed to send form");
        let status = response.status();
        let path = response.url().path().to_string();
        (status, path, response.text().await.expect("Failed to read body"))
    }

    async fn upload(&self, page: &str, action: &str, field: &str, file_name: &str, bytes: Vec<u8>) -> (String, String) {
        let token = self.csrf(page).await;
        let form = multipart::Form::new()
            .text("_csrf", token)
            .part(field.to_string(), multipart::Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .client
            .post(format!("{}{}", BASE_URL, action))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload");
        let path = response.url().path().to_string();
        (path, response.text().await.expect("Failed to read body"))
    }

    /// Register a fresh member and return their pseudo and id
    async fn register(&self) -> (String, i32) {
        let pseudo = unique_pseudo();
        let email = format!("{}@example.org", pseudo);
        let (status, path, _) = self
            .submit(
                "/register",
                "/register",
                &[("pseudo", pseudo.as_str()), ("email", email.as_str()), ("password", PASSWORD)],
            )
            .await;
        assert!(status.is_success());
        assert_eq!(path, "/account");

        let (_, html) = self.get("/account").await;
        let id = extract(&html, "href=\"/users/", "\"")
            .and_then(|id| id.parse().ok())
            .expect("No profile link on account page");
        (pseudo, id)
    }

    async fn add_book(&self, title: &str) -> i32 {
        let (status, path, _) = self
            .submit(
                "/books/new",
                "/books",
                &[
                    ("title", title),
                    ("author", "Ursula K. Le Guin"),
                    ("description", "An ambiguous utopia."),
                    ("status", "available"),
                ],
            )
            .await;
        assert!(status.is_success());
        path.trim_start_matches("/books/").parse().expect("Redirected to the new book")
    }
}

fn unique_pseudo() -> String {
    format!("reader_{}", &Uuid::new_v4().simple().to_string()[..10])
}

fn extract(haystack: &str, start: &str, end: &str) -> Option<String> {
    let from = haystack.find(start)? + start.len();
    let to = from + haystack[from..].find(end)?;
    Some(haystack[from..to].to_string())
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let (status, body) = Visitor::new().get("/health").await;
    assert!(status.is_success());
    assert!(body.contains("healthy"));
}

#[tokio::test]
#[ignore]
async fn test_new_member_sees_directory_instead_of_conversations() {
    let visitor = Visitor::new();
    visitor.register().await;

    let (status, html) = visitor.get("/messages").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No conversations yet."));
}

#[tokio::test]
#[ignore]
async fn test_unread_badge_clears_when_thread_is_opened() {
    let alice = Visitor::new();
    let bob = Visitor::new();
    let (alice_pseudo, alice_id) = alice.register().await;
    let (_, bob_id) = bob.register().await;

    let thread = format!("/messages/{}", bob_id);
    let (status, path, html) = alice.submit(&thread, &thread, &[("content", "Bonjour")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(path, thread);
    assert!(html.contains("Bonjour"));

    let (_, inbox) = bob.get("/messages").await;
    assert!(inbox.contains(&alice_pseudo));
    assert!(inbox.contains("Bonjour"));
    assert!(inbox.contains("<span class=\"badge\">1</span>"));

    let (status, _) = bob.get(&format!("/messages/{}", alice_id)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, inbox) = bob.get("/messages").await;
    assert!(inbox.contains(&alice_pseudo));
    assert!(!inbox.contains("class=\"badge\""));
}

#[tokio::test]
#[ignore]
async fn test_messaging_yourself_is_rejected() {
    let visitor = Visitor::new();
    let (_, id) = visitor.register().await;

    let thread = format!("/messages/{}", id);
    let (status, _) = visitor.get(&thread).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_is_rejected() {
    let first = Visitor::new();
    let (pseudo, _) = first.register().await;

    let second = Visitor::new();
    let (_, path, html) = second
        .submit(
            "/register",
            "/register",
            &[
                ("pseudo", pseudo.to_uppercase().as_str()),
                ("email", format!("{}@example.org", pseudo).as_str()),
                ("password", PASSWORD),
            ],
        )
        .await;

    assert_eq!(path, "/register");
    assert!(html.contains("This pseudo is already taken"));
    assert!(html.contains("An account already exists with this email"));
}

#[tokio::test]
#[ignore]
async fn test_unknown_book_status_is_a_field_error() {
    let visitor = Visitor::new();
    visitor.register().await;
    let id = visitor.add_book("The Dispossessed").await;

    let edit = format!("/books/{}/edit", id);
    let (_, path, html) = visitor
        .submit(
            &edit,
            &format!("/books/{}", id),
            &[("title", "The Dispossessed"), ("author", "Le Guin"), ("status", "lent")],
        )
        .await;
    assert_eq!(path, edit);
    assert!(html.contains("Status must be either available or unavailable"));

    let (_, page) = visitor.get(&format!("/books/{}", id)).await;
    assert!(page.contains("Ursula K. Le Guin"));
}

#[tokio::test]
#[ignore]
async fn test_only_the_owner_can_edit_a_book() {
    let owner = Visitor::new();
    owner.register().await;
    let id = owner.add_book("Earthsea").await;

    let other = Visitor::new();
    other.register().await;
    let (status, _) = other.get(&format!("/books/{}/edit", id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_rejected_uploads_keep_the_current_avatar() {
    let visitor = Visitor::new();
    visitor.register().await;

    let (path, html) = visitor
        .upload("/account", "/account/avatar", "avatar", "notes.txt", b"plain text".to_vec())
        .await;
    assert_eq!(path, "/account");
    assert!(html.contains("Only JPG, PNG, GIF and WEBP images are accepted."));
    assert!(html.contains("/assets/default-avatar.svg"));

    let mut oversized = b"\x89PNG\r\n\x1a\n".to_vec();
    oversized.resize(2 * 1024 * 1024 + 1, 0);
    let (_, html) = visitor
        .upload("/account", "/account/avatar", "avatar", "big.png", oversized)
        .await;
    assert!(html.contains("The image is too large"));
    assert!(html.contains("/assets/default-avatar.svg"));
}

#[tokio::test]
#[ignore]
async fn test_post_without_csrf_token_is_forbidden() {
    let visitor = Visitor::new();
    visitor.register().await;

    let response = visitor
        .client
        .post(format!("{}/books", BASE_URL))
        .form(&[("title", "Forged"), ("author", "Nobody"), ("status", "available")])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_unknown_page_is_404() {
    let (status, html) = Visitor::new().get("/no/such/page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Page not found"));
}
