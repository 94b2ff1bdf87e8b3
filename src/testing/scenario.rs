//! Request scenarios for testing session-protected Axum routers.
//!
//! Sends one request through a [`Router`] without starting a server and
//! offers assertions on status and session cookies.
//!
//! # Example
//!
//! ```rust,ignore
//! use orgward::testing;
//!
//! testing::get(app, "/orgs/abcde/settings")
//!     .session_cookie("orgward_jwt", &token)
//!     .execute()
//!     .await
//!     .assert_ok()
//!     .assert_no_session_cookie("orgward_jwt");
//! ```

use axum::{
    Router,
    body::Body,
    http::{HeaderName, Method, Request, StatusCode, header},
    response::Response,
};
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

/// Test scenario builder for one request.
pub struct Scenario {
    app: Router,
    request: Request<Body>,
}

impl Scenario {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            request: Request::builder()
                .method(Method::GET)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        *self.request.method_mut() = method;
        self
    }

    pub fn uri(mut self, uri: &str) -> Self {
        *self.request.uri_mut() = uri.parse().unwrap();
        self
    }

    /// Append a header. Repeated calls with the same name add more values.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers_mut().append(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
        self
    }

    /// Set the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }

    /// Send a cookie the way a browser would.
    pub fn session_cookie(self, name: &str, token: &str) -> Self {
        self.header("Cookie", &format!("{}={}", name, token))
    }

    pub fn json_body<T: Serialize>(mut self, body: &T) -> Self {
        let json = serde_json::to_string(body).unwrap();
        *self.request.body_mut() = Body::from(json);
        self.request
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    pub async fn execute(self) -> ScenarioAssert {
        let response = self.app.oneshot(self.request).await.unwrap();
        ScenarioAssert { response }
    }
}

/// Assertion builder for test responses.
pub struct ScenarioAssert {
    response: Response,
}

impl ScenarioAssert {
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.response.status(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.response.status()
        );
        self
    }

    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_unauthorized(self) -> Self {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    /// Cookies set by the response, parsed from every `Set-Cookie` header.
    pub fn set_cookies(&self) -> Vec<Cookie<'static>> {
        self.response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
            .collect()
    }

    /// The cookie named `name` set by the response, if any.
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.set_cookies().into_iter().find(|c| c.name() == name)
    }

    /// Assert the response sets `name` to a non-empty value and return it.
    pub fn assert_sets_cookie(&self, name: &str) -> String {
        let cookie = self
            .cookie(name)
            .unwrap_or_else(|| panic!("Cookie '{}' was not set", name));
        assert!(!cookie.value().is_empty(), "Cookie '{}' was cleared, not set", name);
        cookie.value().to_string()
    }

    /// Assert the response clears `name` (empty value, Max-Age=0).
    pub fn assert_clears_cookie(self, name: &str) -> Self {
        let cookie = self
            .cookie(name)
            .unwrap_or_else(|| panic!("Cookie '{}' was not cleared", name));
        assert!(cookie.value().is_empty(), "Cookie '{}' still has a value", name);
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
        self
    }

    pub fn assert_no_session_cookie(self, name: &str) -> Self {
        assert!(self.cookie(name).is_none(), "Unexpected Set-Cookie for '{}'", name);
        self
    }

    pub async fn body_string(self) -> String {
        let bytes = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn json<T: for<'de> Deserialize<'de>>(self) -> T {
        let body = self.body_string().await;
        serde_json::from_str(&body).expect("Failed to parse JSON response")
    }

    /// Get the underlying response for custom assertions.
    pub fn response(self) -> Response {
        self.response
    }
}

pub fn get(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::GET).uri(uri)
}

pub fn post(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::POST).uri(uri)
}

pub fn delete(app: Router, uri: &str) -> Scenario {
    Scenario::new(app).method(Method::DELETE).uri(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, routing::get as axum_get};
    use serde_json::json;

    async fn hello_handler() -> Json<serde_json::Value> {
        Json(json!({"message": "Hello, World!"}))
    }

    async fn set_cookie_handler() -> Response {
        let mut response = Response::new(Body::empty());
        response
            .headers_mut()
            .append(header::SET_COOKIE, "a=1; Path=/".parse().unwrap());
        response
            .headers_mut()
            .append(header::SET_COOKIE, "b=; Max-Age=0".parse().unwrap());
        response
    }

    #[tokio::test]
    async fn test_basic_get() {
        let app = Router::new().route("/hello", axum_get(hello_handler));

        let body: serde_json::Value = get(app, "/hello").execute().await.assert_ok().json().await;
        assert_eq!(body["message"], "Hello, World!");
    }

    #[tokio::test]
    async fn test_cookie_assertions() {
        let app = Router::new().route("/c", axum_get(set_cookie_handler));

        let response = get(app, "/c").execute().await.assert_ok();
        assert_eq!(response.assert_sets_cookie("a"), "1");
        response.assert_clears_cookie("b").assert_no_session_cookie("c");
    }
}
