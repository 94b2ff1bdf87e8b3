//! Email delivery.
//!
//! - [`LogEmailSender`] writes notifications to the log (development)
//! - [`Notifier`] dispatches through any [`EmailSender`](crate::traits::EmailSender)
//!   on background tasks
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orgward::email::{LogEmailSender, Notifier};
//!
//! let notifier = Notifier::new(Arc::new(LogEmailSender::new()));
//! notifier.password_reset(recipient, otp);
//! ```

mod log;
mod notifier;

pub use log::LogEmailSender;
pub use notifier::Notifier;
