use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::{AuthConfig, SameSite};
use crate::error::AppError;

/// Binds a session token to the client through an HttpOnly cookie.
#[derive(Debug, Clone)]
pub struct SessionCarrier {
    cookie_name: String,
    max_age_secs: i64,
    secure: bool,
    same_site: SameSite,
}

impl SessionCarrier {
    pub fn new(cookie_name: impl Into<String>, max_age_secs: i64) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            max_age_secs,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    pub fn from_config(auth: &AuthConfig, max_age_secs: i64) -> Self {
        Self {
            cookie_name: auth.cookie_name.clone(),
            max_age_secs,
            secure: auth.secure_cookie,
            same_site: auth.same_site,
        }
    }

    fn cookie(&self, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite={}; Path=/; Max-Age={}",
            self.cookie_name,
            value,
            self.same_site.as_str(),
            max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.max_age_secs)
    }

    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    /// Adds a `Set-Cookie` carrying `token` to the response headers.
    pub fn attach(&self, headers: &mut HeaderMap, token: &str) -> Result<(), AppError> {
        let value = HeaderValue::from_str(&self.session_cookie(token))
            .map_err(|e| AppError::Internal(format!("invalid session cookie: {}", e)))?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    /// Adds an expiring `Set-Cookie`. Safe to call with no session present.
    pub fn clear(&self, headers: &mut HeaderMap) -> Result<(), AppError> {
        let value = HeaderValue::from_str(&self.clear_cookie())
            .map_err(|e| AppError::Internal(format!("invalid session cookie: {}", e)))?;
        headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    /// The carried token, if the request has a non-empty session cookie.
    pub fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        get_cookie_value(headers, &self.cookie_name).filter(|v| !v.is_empty())
    }
}

pub fn get_cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier() -> SessionCarrier {
        SessionCarrier::new("token", 86_400)
    }

    fn request_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn attach_sets_http_only_cookie_with_lifetime() {
        let mut headers = HeaderMap::new();
        carrier().attach(&mut headers, "abc.def").unwrap();
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert_eq!(
            cookie,
            "token=abc.def; HttpOnly; SameSite=Lax; Path=/; Max-Age=86400"
        );
    }

    #[test]
    fn clear_expires_cookie_and_is_idempotent() {
        let mut headers = HeaderMap::new();
        carrier().clear(&mut headers).unwrap();
        carrier().clear(&mut headers).unwrap();
        let values: Vec<_> = headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 2);
        for v in values {
            assert_eq!(
                v.to_str().unwrap(),
                "token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
            );
        }
    }

    #[test]
    fn secure_flag_follows_config() {
        let auth = AuthConfig {
            secure_cookie: true,
            same_site: SameSite::None,
            ..AuthConfig::default()
        };
        let cookie = SessionCarrier::from_config(&auth, 60).session_cookie("t");
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn extract_finds_named_cookie_among_others() {
        let headers = request_with_cookie("theme=dark; token=abc.def; lang=en");
        assert_eq!(carrier().extract(&headers), Some("abc.def"));
    }

    #[test]
    fn extract_returns_none_when_absent_or_empty() {
        assert_eq!(carrier().extract(&HeaderMap::new()), None);
        assert_eq!(carrier().extract(&request_with_cookie("theme=dark")), None);
        assert_eq!(carrier().extract(&request_with_cookie("token=")), None);
    }

    #[test]
    fn extract_does_not_match_cookie_name_prefixes() {
        let headers = request_with_cookie("token_old=stale");
        assert_eq!(carrier().extract(&headers), None);
    }

    #[test]
    fn configured_cookie_name_is_written_and_read() {
        let auth = AuthConfig {
            cookie_name: "quill_session".to_string(),
            ..AuthConfig::default()
        };
        let carrier = SessionCarrier::from_config(&auth, 60);
        assert!(carrier.session_cookie("t").starts_with("quill_session=t;"));
        assert_eq!(
            carrier.extract(&request_with_cookie("token=x; quill_session=t")),
            Some("t")
        );
    }
}
