//! Utility functions and helpers.
//!
//! Environment lookups, clock access, and random identifiers.

pub mod env;
mod random;
mod time;

pub use env::{get_env_parsed, get_env_with_prefix};
pub use random::{generate_jti, generate_org_id, generate_otp, hash_otp};
pub use time::current_timestamp;
