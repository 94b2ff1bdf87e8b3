//! Storage traits for organizations.
//!
//! Every multi-row mutation is one transaction in the implementation. A
//! failed workflow leaves no partial state behind.

mod invitation;
mod membership;
mod organization;

pub use invitation::InvitationStore;
pub use membership::MembershipStore;
pub use organization::OrganizationStore;
