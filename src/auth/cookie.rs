//! `Set-Cookie` construction for session and password-reset tokens.

use crate::config::AuthConfig;
use axum::http::{HeaderMap, HeaderValue, header};
use cookie::{Cookie, SameSite};
use std::time::Duration;

/// Cookie names and attributes derived from [`AuthConfig`].
#[derive(Debug, Clone)]
pub struct CookieSettings {
    session_name: String,
    reset_name: String,
    session_ttl: Duration,
    reset_ttl: Duration,
    secure: bool,
    domain: Option<String>,
}

impl CookieSettings {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            session_name: config.session_cookie_name(),
            reset_name: config.reset_cookie_name(),
            session_ttl: config.session_ttl(),
            reset_ttl: config.password_reset_ttl(),
            secure: config.cookie_secure,
            domain: config.cookie_domain.clone(),
        }
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.session_name
    }

    pub fn reset_cookie_name(&self) -> &str {
        &self.reset_name
    }

    /// Session cookie carrying `token`, living as long as the token.
    pub fn session_cookie(&self, token: impl Into<String>) -> Cookie<'static> {
        self.build(self.session_name.clone(), token.into(), self.session_ttl)
    }

    /// Password-reset cookie carrying `token`.
    pub fn reset_cookie(&self, token: impl Into<String>) -> Cookie<'static> {
        self.build(self.reset_name.clone(), token.into(), self.reset_ttl)
    }

    /// Empty, immediately-expiring session cookie. Used for logout and failed auth.
    pub fn clear_session_cookie(&self) -> Cookie<'static> {
        self.build(self.session_name.clone(), String::new(), Duration::ZERO)
    }

    pub fn clear_reset_cookie(&self) -> Cookie<'static> {
        self.build(self.reset_name.clone(), String::new(), Duration::ZERO)
    }

    /// `true` if `headers` already set the session cookie.
    pub fn sets_session_cookie(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw).ok())
            .any(|cookie| cookie.name() == self.session_name)
    }

    fn build(&self, name: String, value: String, max_age: Duration) -> Cookie<'static> {
        // Saturate instead of wrapping into a negative Max-Age.
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let mut builder = Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(max_age));

        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}

/// Append `cookie` as a `Set-Cookie` header.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, cookie = cookie.name(), "unencodable cookie"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secure: bool, domain: Option<&str>) -> CookieSettings {
        CookieSettings::from_config(&AuthConfig {
            cookie_secure: secure,
            cookie_domain: domain.map(str::to_string),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_session_cookie_attributes() {
        let rendered = settings(true, None).session_cookie("tok").to_string();

        assert!(rendered.starts_with("orgward_jwt=tok"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=1800"));
        assert!(!rendered.contains("Domain"));
    }

    #[test]
    fn test_insecure_dev_cookie_with_domain() {
        let rendered = settings(false, Some("acme.test"))
            .reset_cookie("tok")
            .to_string();

        assert!(rendered.starts_with("orgward_pwreset_jwt=tok"));
        assert!(!rendered.contains("Secure"));
        assert!(rendered.contains("Domain=acme.test"));
        assert!(rendered.contains("Max-Age=86400"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let rendered = settings(false, None).clear_session_cookie().to_string();
        assert!(rendered.starts_with("orgward_jwt=;"));
        assert!(rendered.contains("Max-Age=0"));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let settings = CookieSettings::from_config(&AuthConfig {
            session_ttl_secs: u64::MAX,
            ..AuthConfig::default()
        });
        let rendered = settings.session_cookie("tok").to_string();

        assert!(rendered.contains(&format!("Max-Age={}", i64::MAX)));
        assert!(!rendered.contains("Max-Age=-"));
    }

    #[test]
    fn test_sets_session_cookie() {
        let settings = settings(false, None);
        let mut headers = HeaderMap::new();
        assert!(!settings.sets_session_cookie(&headers));

        append_cookie(&mut headers, &settings.reset_cookie("r"));
        assert!(!settings.sets_session_cookie(&headers));

        append_cookie(&mut headers, &settings.session_cookie("s"));
        assert!(settings.sets_session_cookie(&headers));
    }
}
