//! Resolves who is calling: an authenticated user or an anonymous session.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::history::Identity;
use crate::history::session::{is_valid_session_id, new_session_id};
use crate::state::AppState;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity, plus the session cookie to hand out if one was just issued.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub identity: Identity,
    set_cookie: Option<HeaderValue>,
}

impl RequestIdentity {
    /// Id of the authenticated user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match &self.identity {
            Identity::User(id) => Some(id),
            Identity::Anonymous(_) => None,
        }
    }

    /// Attach the freshly issued session cookie to `body`'s response.
    pub fn respond(self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if let Some(cookie) = self.set_cookie {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        response
    }
}

impl FromRequestParts<AppState> for RequestIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        if let Some(user_id) = user_from_headers(&parts.headers) {
            return Ok(Self {
                identity: Identity::User(user_id),
                set_cookie: None,
            });
        }

        let sessions = state.history.sessions();
        let cookie_name = &state.config.session.cookie_name;
        if let Some(session_id) = session_from_cookies(&parts.headers, cookie_name) {
            if sessions.contains(&session_id).await {
                return Ok(Self {
                    identity: Identity::Anonymous(session_id),
                    set_cookie: None,
                });
            }
            debug!("Unknown or expired session, issuing a new one");
        }

        let purged = sessions.purge_expired().await;
        if purged > 0 {
            debug!("Purged {} expired session(s)", purged);
        }

        let session_id = new_session_id();
        sessions.create(&session_id).await;
        let set_cookie = match HeaderValue::from_str(&session_cookie(cookie_name, &session_id)) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cannot build session cookie '{}': {}", cookie_name, e);
                None
            }
        };

        Ok(Self {
            identity: Identity::Anonymous(session_id),
            set_cookie,
        })
    }
}

fn user_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Extract a well-formed session id from the `Cookie` headers.
pub fn session_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|id| is_valid_session_id(id))
        .map(str::to_string)
}

#[must_use]
pub fn session_cookie(cookie_name: &str, session_id: &str) -> String {
    format!("{cookie_name}={session_id}; HttpOnly; Path=/; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SID: &str = "0123456789abcdef0123456789abcdef";

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_session_cookie_is_found_among_others() {
        let cookie = format!("theme=dark; weathervane_session={SID}; lang=ru");
        let map = headers(&[("cookie", cookie.as_str())]);
        assert_eq!(
            session_from_cookies(&map, "weathervane_session").as_deref(),
            Some(SID)
        );
    }

    #[test]
    fn test_malformed_session_cookie_is_ignored() {
        let map = headers(&[("cookie", "weathervane_session=../../etc")]);
        assert!(session_from_cookies(&map, "weathervane_session").is_none());
        assert!(session_from_cookies(&HeaderMap::new(), "weathervane_session").is_none());
    }

    #[test]
    fn test_user_header_is_trimmed_and_blank_is_anonymous() {
        let map = headers(&[("x-user-id", "  alice ")]);
        assert_eq!(user_from_headers(&map).as_deref(), Some("alice"));

        let blank = headers(&[("x-user-id", "   ")]);
        assert!(user_from_headers(&blank).is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("sid", SID);
        assert!(cookie.starts_with(&format!("sid={SID}")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }
}
