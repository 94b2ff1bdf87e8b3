//! Axum middleware for session authentication and organization authorization.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::{get, post}};
//! use orgward::auth::{RequireOrgPermissions, RequireSession, Reauthorize, SessionLayer};
//! use orgward::permissions::{ActionPermissions, Permission};
//!
//! let layer = SessionLayer::from_config(&config.auth)?;
//! let admin = ActionPermissions::new().with("admin", Permission::WRITE);
//!
//! let app = Router::new()
//!     .route("/orgs/{org_id}/members", post(invite))
//!     .route_layer(from_fn_with_state(
//!         RequireOrgPermissions::new(layer.clone(), admin),
//!         RequireOrgPermissions::middleware,
//!     ))
//!     .route("/me", get(me))
//!     .route_layer(from_fn_with_state(layer, RequireSession::middleware));
//! ```

use super::claims::SessionClaims;
use super::codec::{IssuedSession, TokenCodec};
use super::cookie::{CookieSettings, append_cookie};
use super::error::AuthError;
use super::pipeline::AuthPipeline;
use super::token::TokenExtractor;
use crate::config::AuthConfig;
use crate::error::OrgwardError;
use crate::permissions::ActionPermissions;
use axum::RequestExt;
use axum::extract::{RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Shared state for the session middlewares.
#[derive(Debug, Clone)]
pub struct SessionLayer {
    pipeline: AuthPipeline,
    cookies: CookieSettings,
}

impl SessionLayer {
    pub fn new(pipeline: AuthPipeline, cookies: CookieSettings) -> Self {
        Self { pipeline, cookies }
    }

    /// Build the codec, pipeline and cookie settings from one config.
    pub fn from_config(config: &AuthConfig) -> crate::Result<Self> {
        let codec = TokenCodec::new(config)?;
        Ok(Self::new(
            AuthPipeline::new(codec),
            CookieSettings::from_config(config),
        ))
    }

    pub fn pipeline(&self) -> &AuthPipeline {
        &self.pipeline
    }

    pub fn cookies(&self) -> &CookieSettings {
        &self.cookies
    }

    fn credential(&self, request: &Request) -> Option<String> {
        TokenExtractor::session_credential(request.headers(), self.cookies.session_cookie_name())
            .map(|credential| credential.token)
    }

    /// 401 with the session cookie cleared.
    fn reject(&self, err: AuthError) -> Response {
        tracing::debug!(reason = %err, "request rejected by session check");
        let mut response = OrgwardError::from(err).into_response();
        append_cookie(response.headers_mut(), &self.cookies.clear_session_cookie());
        response
    }

    /// Set `issued` as the new session cookie unless the handler already set one.
    fn attach(&self, response: &mut Response, issued: &IssuedSession) {
        if self.cookies.sets_session_cookie(response.headers()) {
            return;
        }
        append_cookie(
            response.headers_mut(),
            &self.cookies.session_cookie(issued.token.clone()),
        );
    }
}

/// Requires a valid session. Claims are inserted into request extensions.
pub struct RequireSession;

impl RequireSession {
    pub async fn middleware(
        State(layer): State<SessionLayer>,
        mut request: Request,
        next: Next,
    ) -> Response {
        let credential = layer.credential(&request);
        let authenticated = match layer.pipeline.authenticate(credential.as_deref()) {
            Ok(authenticated) => authenticated,
            Err(err) => return layer.reject(err),
        };

        request.extensions_mut().insert(authenticated.claims);
        let mut response = next.run(request).await;

        if let Some(renewed) = &authenticated.renewed {
            layer.attach(&mut response, renewed);
        }
        response
    }
}

/// Requires a session scoped to the organization named in the route path,
/// holding every grant in `required`.
#[derive(Debug, Clone)]
pub struct RequireOrgPermissions {
    layer: SessionLayer,
    required: ActionPermissions,
    path_param: String,
}

impl RequireOrgPermissions {
    /// Reads the organization id from the `{org_id}` path segment.
    pub fn new(layer: SessionLayer, required: ActionPermissions) -> Self {
        Self {
            layer,
            required,
            path_param: "org_id".to_string(),
        }
    }

    /// Read the organization id from a differently named path segment.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>) -> Self {
        self.path_param = name.into();
        self
    }

    pub async fn middleware(
        State(guard): State<RequireOrgPermissions>,
        mut request: Request,
        next: Next,
    ) -> Response {
        let layer = &guard.layer;
        let credential = layer.credential(&request);

        let org_id = match request.extract_parts::<RawPathParams>().await {
            Ok(params) => params
                .iter()
                .find(|(key, _)| *key == guard.path_param)
                .map(|(_, value)| value.to_string()),
            Err(_) => None,
        };
        let Some(org_id) = org_id else {
            tracing::error!(param = %guard.path_param, "organization route without id segment");
            return OrgwardError::internal("organization id missing from route").into_response();
        };

        let authenticated = match layer.pipeline.authorize_for_organization(
            credential.as_deref(),
            &org_id,
            &guard.required,
        ) {
            Ok(authenticated) => authenticated,
            Err(err) => return layer.reject(err),
        };

        request.extensions_mut().insert(authenticated.claims);
        let mut response = next.run(request).await;

        if let Some(renewed) = &authenticated.renewed {
            layer.attach(&mut response, renewed);
        }
        response
    }
}

/// Reissues the session after a successful handler.
///
/// Layer inside [`RequireSession`] or [`RequireOrgPermissions`]. A handler
/// that changed the caller's organization or grants puts the new
/// [`SessionClaims`] into the response extensions; otherwise the request's
/// own claims are reissued.
pub struct Reauthorize;

impl Reauthorize {
    pub async fn middleware(
        State(layer): State<SessionLayer>,
        request: Request,
        next: Next,
    ) -> Response {
        let Some(claims) = request.extensions().get::<SessionClaims>().cloned() else {
            return layer.reject(AuthError::MissingCredential);
        };

        let mut response = next.run(request).await;
        if !response.status().is_success() {
            return response;
        }

        let claims = response
            .extensions_mut()
            .remove::<SessionClaims>()
            .unwrap_or(claims);

        match layer.pipeline.reauthorize(&claims) {
            Ok(issued) => {
                tracing::debug!(user_id = claims.user_id, "session reissued");
                layer.attach(&mut response, &issued);
                response
            }
            Err(err) => OrgwardError::from(err).into_response(),
        }
    }
}
