//! Bitmask permissions scoped to named actions.
//!
//! A [`Permission`] is a set of capability bits. Grants are always attached
//! to an action name (`"admin"`, `"owner"`, ...) inside one organization, and
//! a grant satisfies a requirement when it contains every required bit.
//!
//! # Example
//!
//! ```rust
//! use orgward::permissions::{ActionPermissions, Permission};
//!
//! let mut granted = ActionPermissions::new();
//! granted.grant("admin", Permission::READ_WRITE);
//!
//! assert!(granted.get("admin").satisfies(Permission::WRITE));
//! assert!(!granted.get("admin").satisfies(Permission::ALL));
//! assert!(granted.get("billing").is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Version of the persisted and token-embedded permission map format.
pub const PERMISSIONS_FORMAT_VERSION: u16 = 1;

/// Capability bitmask for a single action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const NONE: Permission = Permission(0);
    pub const READ: Permission = Permission(1);
    pub const WRITE: Permission = Permission(1 << 1);
    pub const READ_WRITE: Permission = Permission(Self::READ.0 | Self::WRITE.0);
    /// Every bit set, including bits for flags that do not exist yet.
    pub const ALL: Permission = Permission(u32::MAX);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `required` is present in `self`.
    #[must_use]
    pub const fn satisfies(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn combine(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }
}

/// Free-function form of [`Permission::satisfies`].
#[must_use]
pub const fn satisfies(granted: Permission, required: Permission) -> bool {
    granted.satisfies(required)
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        self.combine(rhs)
    }
}

impl BitOrAssign for Permission {
    fn bitor_assign(&mut self, rhs: Permission) {
        *self = self.combine(rhs);
    }
}

impl From<u32> for Permission {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("none"),
            Self::READ => f.write_str("read"),
            Self::WRITE => f.write_str("write"),
            Self::READ_WRITE => f.write_str("read_write"),
            Self::ALL => f.write_str("all"),
            Self(bits) => write!(f, "{:#b}", bits),
        }
    }
}

/// Per-action permission map for one user in one organization.
///
/// Missing actions read as [`Permission::NONE`]. Serializes as a plain JSON
/// object of action name to integer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionPermissions(BTreeMap<String, Permission>);

impl ActionPermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant.
    #[must_use]
    pub fn with(mut self, action: impl Into<String>, permission: Permission) -> Self {
        self.grant(action, permission);
        self
    }

    /// Set the grant for `action`, replacing any previous value.
    pub fn grant(&mut self, action: impl Into<String>, permission: Permission) {
        self.0.insert(action.into(), permission);
    }

    /// Remove the grant for `action`, returning what was there.
    pub fn revoke(&mut self, action: &str) -> Option<Permission> {
        self.0.remove(action)
    }

    #[must_use]
    pub fn get(&self, action: &str) -> Permission {
        self.0.get(action).copied().unwrap_or(Permission::NONE)
    }

    /// `true` when every required action is satisfied by this map.
    ///
    /// An empty requirement is always satisfied.
    #[must_use]
    pub fn satisfies_all(&self, required: &ActionPermissions) -> bool {
        self.first_unsatisfied(required).is_none()
    }

    /// The first required action this map does not satisfy, if any.
    #[must_use]
    pub fn first_unsatisfied<'a>(&self, required: &'a ActionPermissions) -> Option<&'a str> {
        required
            .iter()
            .find(|(action, needed)| !self.get(action).satisfies(*needed))
            .map(|(action, _)| action)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Permission)> {
        self.0.iter().map(|(action, perm)| (action.as_str(), *perm))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as the versioned envelope used for storage.
    pub fn to_versioned_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&PermissionsEnvelope {
            v: PERMISSIONS_FORMAT_VERSION,
            perms: self.clone(),
        })
    }

    /// Decode the versioned envelope, rejecting formats newer than this build.
    pub fn from_versioned_json(raw: &str) -> Result<Self, PermissionsDecodeError> {
        let envelope: PermissionsEnvelope = serde_json::from_str(raw)?;
        check_version(envelope.v)?;
        Ok(envelope.perms)
    }
}

impl<S: Into<String>> FromIterator<(S, Permission)> for ActionPermissions {
    fn from_iter<I: IntoIterator<Item = (S, Permission)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(a, p)| (a.into(), p)).collect())
    }
}

/// Check that a permission format version can be read by this build.
pub fn check_version(version: u16) -> Result<(), PermissionsDecodeError> {
    if version == 0 || version > PERMISSIONS_FORMAT_VERSION {
        return Err(PermissionsDecodeError::UnsupportedVersion(version));
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct PermissionsEnvelope {
    v: u16,
    perms: ActionPermissions,
}

/// Errors decoding a stored permission map.
#[derive(Debug, thiserror::Error)]
pub enum PermissionsDecodeError {
    #[error("malformed permission map: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported permission format version {0}")]
    UnsupportedVersion(u16),
}

impl From<PermissionsDecodeError> for crate::error::OrgwardError {
    fn from(err: PermissionsDecodeError) -> Self {
        crate::error::OrgwardError::internal(err.to_string())
    }
}
