use std::time::Duration;

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn set_cookie(name: &str, value: &str, max_age: Duration) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{name}={value}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Lax",
        max_age.as_secs()
    ))
    .expect("cookie value is ascii")
}

fn clear_cookie(name: &str) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{name}=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=Lax"
    ))
    .expect("cookie value is ascii")
}

/// Set-Cookie headers for a freshly issued token pair. Cookie lifetimes track
/// the token TTLs.
pub fn auth_cookies(
    access_token: &str,
    access_ttl: Duration,
    refresh_token: &str,
    refresh_ttl: Duration,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, set_cookie(ACCESS_COOKIE, access_token, access_ttl));
    headers.append(
        SET_COOKIE,
        set_cookie(REFRESH_COOKIE, refresh_token, refresh_ttl),
    );
    headers
}

pub fn clear_auth_cookies() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, clear_cookie(ACCESS_COOKIE));
    headers.append(SET_COOKIE, clear_cookie(REFRESH_COOKIE));
    headers
}

/// Read a cookie from the request's Cookie header(s).
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name).then(|| v.to_string())
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_cookies_are_http_only_and_secure() {
        let headers = auth_cookies(
            "acc.jwt",
            Duration::from_secs(300),
            "ref.jwt",
            Duration::from_secs(3600),
        );
        let values: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("accessToken=acc.jwt; Max-Age=300"));
        assert!(values[1].starts_with("refreshToken=ref.jwt; Max-Age=3600"));
        for v in &values {
            assert!(v.contains("HttpOnly"));
            assert!(v.contains("Secure"));
        }
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        let headers = clear_auth_cookies();
        for v in headers.get_all(SET_COOKIE) {
            assert!(v.to_str().unwrap().contains("Max-Age=0"));
        }
    }

    #[test]
    fn cookie_value_parses_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(
            COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def.ghi; other=1"),
        );
        assert_eq!(
            cookie_value(&headers, "accessToken").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(cookie_value(&headers, "refreshToken"), None);
    }
}
