//! Collaborator traits.
//!
//! The core talks to user storage, pending signups, reset-record storage and
//! email delivery only through these traits. In-memory implementations live
//! in [`crate::testing`].

pub mod email;
pub mod reset;
pub mod user;

pub use email::{EmailRecipient, EmailSender};
pub use reset::{PasswordResetRecord, PasswordResetStore};
pub use user::{NewOAuthUser, UnconfirmedUser, UnconfirmedUserStore, User, UserStore};
