//! Cookie sessions: who is making the request, and the extractors handlers use.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use tracing::warn;

use crate::domain::entities::UserRecord;
use crate::presentation::urls;

use super::found;
use super::public::HttpState;

pub const SESSION_COOKIE: &str = "sessionid";

/// The authenticated user, stored in request and response extensions.
#[derive(Clone, Debug)]
pub struct SessionUser(pub UserRecord);

/// Resolve the session cookie before handlers run.
pub async fn resolve_session(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let user = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.accounts.authenticate(cookie.value()).await {
            Ok(user) => user,
            Err(err) => {
                warn!(
                    target = "blogicum::http::session",
                    error = %err,
                    "session lookup failed; continuing anonymously"
                );
                None
            }
        },
        None => None,
    };

    let session_user = user.map(SessionUser);
    if let Some(session_user) = &session_user {
        request.extensions_mut().insert(session_user.clone());
    }

    let mut response = next.run(request).await;
    if let Some(session_user) = session_user {
        response.extensions_mut().insert(session_user);
    }
    response
}

/// The signed-in user, if any.
pub struct CurrentUser(pub Option<UserRecord>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<SessionUser>()
                .map(|session| session.0.clone()),
        ))
    }
}

/// A signed-in user; anonymous requests are sent to the login page.
pub struct RequireUser(pub UserRecord);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<SessionUser>() {
            Some(session) => Ok(Self(session.0.clone())),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(found(&urls::login_with_next(next)))
            }
        }
    }
}

pub(crate) fn session_cookie(
    token: String,
    expires_at: OffsetDateTime,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .expires(expires_at)
        .build()
}

pub(crate) fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn session_cookie_is_http_only_and_lax() {
        let cookie = session_cookie("token".into(), datetime!(2030-01-01 00:00 UTC), false);
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("sessionid=token"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn secure_flag_follows_settings() {
        let cookie = session_cookie("token".into(), datetime!(2030-01-01 00:00 UTC), true);
        assert_eq!(cookie.secure(), Some(true));
    }
}
