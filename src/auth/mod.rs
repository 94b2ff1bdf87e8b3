//! Session tokens and per-request authorization.
//!
//! Sessions are stateless HS256 tokens carrying the user, the active
//! organization, and the user's grants in it. Logging out only clears the
//! cookie; a copied token stays valid until it expires.
//!
//! - [`TokenCodec`] signs and verifies session and password-reset tokens
//! - [`AuthPipeline`] authenticates a credential and checks organization grants
//! - [`RequireSession`], [`RequireOrgPermissions`] and [`Reauthorize`] wire the
//!   pipeline into Axum
//! - [`SessionService`] runs login, OAuth login, organization switching and
//!   the password reset flow
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Router, middleware, routing::post};
//! use orgward::auth::{RequireOrgPermissions, SessionLayer};
//! use orgward::permissions::{ActionPermissions, Permission};
//!
//! let layer = SessionLayer::from_config(&config.auth)?;
//! let admin = RequireOrgPermissions::new(
//!     layer.clone(),
//!     ActionPermissions::new().with("admin", Permission::WRITE),
//! );
//!
//! let app = Router::new()
//!     .route("/orgs/{org_id}/invites", post(create_invite))
//!     .route_layer(middleware::from_fn_with_state(admin, RequireOrgPermissions::middleware));
//! ```

pub mod claims;
pub mod codec;
pub mod cookie;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod pipeline;
pub mod session;
pub mod token;

pub use claims::{PasswordResetClaims, SessionClaims, SessionSubject, TokenType};
pub use codec::{IssuedSession, TokenCodec};
pub use cookie::CookieSettings;
pub use error::AuthError;
pub use extractors::{CurrentClaims, OptionalClaims};
pub use middleware::{Reauthorize, RequireOrgPermissions, RequireSession, SessionLayer};
pub use password::{PasswordConfig, PasswordHasher, PasswordPolicy, UNUSABLE_PASSWORD_HASH};
pub use pipeline::{AuthPipeline, Authenticated};
pub use session::{OAuthLogin, SessionService};
pub use token::{Credential, CredentialSource, TokenExtractor};
