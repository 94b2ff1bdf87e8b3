use axum::http::{HeaderMap, header};
use cookie::Cookie;

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Cookie,
    Bearer,
}

/// A raw token lifted off a request, not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub source: CredentialSource,
}

/// Pulls tokens out of request headers.
pub struct TokenExtractor;

impl TokenExtractor {
    /// Token from an `Authorization: Bearer <token>` header.
    pub fn from_header(headers: &HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Value of the cookie named `cookie_name`, searching every `Cookie` header.
    pub fn from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| Cookie::split_parse(raw))
            .filter_map(|cookie| cookie.ok())
            .find(|cookie| cookie.name() == cookie_name && !cookie.value().is_empty())
            .map(|cookie| cookie.value().to_string())
    }

    /// The session credential for a request.
    ///
    /// The session cookie wins when both a cookie and a bearer header are present.
    pub fn session_credential(headers: &HeaderMap, cookie_name: &str) -> Option<Credential> {
        if let Some(token) = Self::from_cookie(headers, cookie_name) {
            return Some(Credential {
                token,
                source: CredentialSource::Cookie,
            });
        }

        Self::from_header(headers).map(|token| Credential {
            token,
            source: CredentialSource::Bearer,
        })
    }
}
