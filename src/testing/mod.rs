//! Testing utilities.
//!
//! In-memory implementations of the collaborator traits, a recording email
//! sender, request scenarios for routers guarded by the session middleware,
//! and (feature `test-helpers`) an SQLite test database.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orgward::email::Notifier;
//! use orgward::testing::{InMemoryResetStore, InMemoryUserStore, RecordingEmailSender};
//!
//! let users = InMemoryUserStore::new();
//! let resets = InMemoryResetStore::new();
//! let mail = RecordingEmailSender::new();
//! let notifier = Notifier::new(Arc::new(mail.clone()));
//! ```

#[cfg(feature = "test-helpers")]
mod database;
mod email;
mod reset;
mod scenario;
mod users;

#[cfg(feature = "test-helpers")]
pub use database::TestDb;
pub use email::{RecordingEmailSender, SentEmail, SentEmailKind};
pub use reset::InMemoryResetStore;
pub use scenario::{Scenario, ScenarioAssert, delete, get, post};
pub use users::InMemoryUserStore;
