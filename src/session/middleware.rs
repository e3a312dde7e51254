//! Session loading and persistence around each request

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::{generate_token, Session, SessionData};
use crate::{error::AppResult, AppState};

/// Whether the request reached the proxy over TLS
fn forwarded_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|proto| proto.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// Load the session named by the cookie, expose it to handlers, then persist it.
///
/// An id that does not match a stored record is never reused: a fresh one is
/// issued instead.
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let config = &state.config.session;

    let existing = match jar.get(&config.cookie_name) {
        Some(cookie) => state
            .sessions
            .load(cookie.value())
            .await?
            .map(|data| (cookie.value().to_string(), data)),
        None => None,
    };

    let (mut id, data, is_new) = match existing {
        Some((id, data)) => (id, data, false),
        None => (generate_token(), SessionData::default(), true),
    };

    let secure = state.config.server.https || forwarded_https(request.headers());

    let session = Session::new(data);
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;
    let outcome = session.finish();

    if outcome.destroyed {
        if !is_new {
            state.sessions.delete(&id).await?;
        }
        let removal = Cookie::build((config.cookie_name.clone(), "")).path("/");
        return Ok((jar.remove(removal), response).into_response());
    }

    if outcome.rotate && !is_new {
        state.sessions.delete(&id).await?;
        id = generate_token();
        tracing::debug!("Session id rotated");
    }

    let issue_cookie = outcome.rotate || (is_new && outcome.dirty);

    if outcome.dirty || outcome.rotate || !is_new {
        state
            .sessions
            .save(&id, &outcome.data, config.idle_timeout_secs)
            .await?;
    }

    if issue_cookie {
        let cookie = Cookie::build((config.cookie_name.clone(), id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .build();
        return Ok((jar.add(cookie), response).into_response());
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_https() {
        let mut headers = HeaderMap::new();
        assert!(!forwarded_https(&headers));

        headers.insert("x-forwarded-proto", "HTTPS".parse().unwrap());
        assert!(forwarded_https(&headers));

        headers.insert("x-forwarded-proto", "http".parse().unwrap());
        assert!(!forwarded_https(&headers));
    }
}
