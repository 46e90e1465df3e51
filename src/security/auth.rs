//! HTTP Basic authentication for credential-gated routes.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::schema::{Credentials, Route};
use crate::error::ProxyError;

/// Decode `Authorization: Basic <base64(user:pass)>`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Gate a request on the route's credentials, if it has any.
pub fn authorize(route: &Route, headers: &HeaderMap) -> Result<(), ProxyError> {
    let Some(expected) = &route.auth else {
        return Ok(());
    };

    match basic_credentials(headers) {
        Some((username, password)) if credentials_match(expected, &username, &password) => Ok(()),
        _ => Err(ProxyError::Unauthorized),
    }
}

fn credentials_match(expected: &Credentials, username: &str, password: &str) -> bool {
    expected.username == username && expected.password == password
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic(user: &str, pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let token = STANDARD.encode(format!("{}:{}", user, pass));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_decode_basic() {
        assert_eq!(
            basic_credentials(&basic("admin", "1234")),
            Some(("admin".into(), "1234".into()))
        );
        // Colons after the first belong to the password.
        assert_eq!(
            basic_credentials(&basic("admin", "12:34")),
            Some(("admin".into(), "12:34".into()))
        );
    }

    #[test]
    fn test_malformed_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(basic_credentials(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(basic_credentials(&headers), None);

        // "admin" without a colon
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic YWRtaW4="));
        assert_eq!(basic_credentials(&headers), None);
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("basic YWRtaW46MTIzNA=="));
        assert_eq!(basic_credentials(&headers), Some(("admin".into(), "1234".into())));
    }

    #[test]
    fn test_authorize() {
        let secure = Route::to_target("/secure", "http://a").with_auth("admin", "1234");
        let open = Route::to_target("/open", "http://a");

        assert!(authorize(&secure, &basic("admin", "1234")).is_ok());
        assert!(matches!(
            authorize(&secure, &basic("admin", "wrongpass")),
            Err(ProxyError::Unauthorized)
        ));
        assert!(matches!(
            authorize(&secure, &HeaderMap::new()),
            Err(ProxyError::Unauthorized)
        ));

        assert!(authorize(&open, &HeaderMap::new()).is_ok());
        assert!(authorize(&open, &basic("anyone", "anything")).is_ok());
    }
}
