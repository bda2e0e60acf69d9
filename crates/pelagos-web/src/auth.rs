//! Session-cookie authentication for the login and admin surfaces.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use pelagos_core::models::UserAccount;
use pelagos_core::{PelagosError, Result};

use crate::WebState;
use crate::error::error_response;

pub(crate) const SESSION_COOKIE: &str = "pelagos_session";

/// Rejects requests without a valid admin session before they reach the
/// admin API handlers. Missing and expired cookies give 401, a logged-in
/// non-administrator gives 403.
pub async fn require_admin(State(state): State<WebState>, request: Request, next: Next) -> Response {
    match authenticate(&state, request.headers()) {
        Ok(user) if user.is_admin => next.run(request).await,
        Ok(_) => error_response(
            PelagosError::Forbidden("administrator access required".to_string()),
            "auth.require_admin",
            None,
        ),
        Err(err) => error_response(err, "auth.require_admin", None),
    }
}

/// Resolves the session cookie to its account. Absent and expired cookies
/// both come back as `Unauthorized`.
pub(crate) fn authenticate(state: &WebState, headers: &HeaderMap) -> Result<UserAccount> {
    let Some(token) = session_token(headers) else {
        return Err(PelagosError::Unauthorized("login required".to_string()));
    };
    match state.store.lookup_auth_session(&token)? {
        Some(user) => Ok(user),
        None => Err(PelagosError::Unauthorized(
            "session expired or revoked".to_string(),
        )),
    }
}

pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.trim().to_string())
    })
}

pub(crate) fn session_cookie(token: &str, max_age_secs: u64) -> Result<HeaderValue> {
    let cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    HeaderValue::from_str(&cookie)
        .map_err(|_| PelagosError::Internal("session token is not header-safe".to_string()))
}

pub(crate) fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("pelagos_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::{SESSION_COOKIE, clear_session_cookie, session_cookie, session_token};

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).expect("cookie"));
        headers
    }

    #[test]
    fn session_token_is_found_among_other_cookies() {
        let headers = headers_with_cookie("theme=dark; pelagos_session=abc-123; lang=el");
        assert_eq!(session_token(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn unrelated_cookies_yield_no_token() {
        let headers = headers_with_cookie("theme=dark; pelagos_session_old=zzz");
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn issued_cookie_is_scoped_and_http_only() {
        let cookie = session_cookie("tok", 3600).expect("cookie");
        let value = cookie.to_str().expect("ascii");
        assert!(value.starts_with("pelagos_session=tok"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=3600"));
        assert!(value.contains("Path=/"));
    }

    #[test]
    fn clearing_cookie_matches_the_session_name() {
        let value = clear_session_cookie();
        let text = value.to_str().expect("ascii");
        assert!(text.starts_with(&format!("{SESSION_COOKIE}=;")));
        assert!(text.contains("Max-Age=0"));
    }
}
