//! Orgward - session tokens and organization permissions for multi-tenant SaaS
//!
//! Orgward provides the authentication and authorization core of a B2B
//! backend built on Axum and Tokio:
//!
//! # Features
//!
//! - **Sessions**: stateless HS256 tokens scoped to one organization at a time,
//!   renewed automatically when past half their lifetime
//! - **Permissions**: per-action bitmask grants with subset checks
//! - **Organizations**: creation, invites, membership and ownership transfer,
//!   each workflow atomic in storage
//! - **Identity**: OAuth logins linked to local accounts by email, and
//!   password signups confirmed by an emailed OTP
//! - **Password reset**: OTP handoff to a narrow, single-purpose reset token
//! - **Database**: SeaORM storage behind the `database` feature
//! - **Testing**: in-memory stores and request scenarios
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use orgward::{ConfigBuilder, auth::SessionLayer};
//!
//! fn main() -> orgward::Result<()> {
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     orgward::init_tracing_with_config(&config.logging);
//!
//!     let layer = SessionLayer::from_config(&config.auth)?;
//!     // attach `layer` to routes with axum::middleware::from_fn_with_state
//!     # let _ = layer;
//!     Ok(())
//! }
//! ```

pub mod auth;
mod config;
pub mod email;
mod error;
pub mod identity;
pub mod organizations;
pub mod permissions;
pub mod testing;
pub mod traits;
pub mod utils;

/// Numeric id of a local user account.
pub type UserId = u32;

// Re-exports for public API
pub use config::{AuthConfig, Config, ConfigBuilder, LoggingConfig, MIN_SECRET_LEN};
pub use error::{ErrorResponse, OrgwardError, Result};
pub use permissions::{ActionPermissions, Permission};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "orgward=debug")
/// - `ORGWARD_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// # Example
///
/// ```rust,no_run
/// orgward::init_tracing();
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = utils::get_env_parsed::<bool>("LOG_JSON").unwrap_or(false);
    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from a [`LoggingConfig`].
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init_tracing_with_config(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    install_subscriber(env_filter, config.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    // try_init: a second call (e.g. from several tests) keeps the first subscriber.
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
