//! `astral-auth`: tenancy and authorization boundary.
//!
//! Resolves an authenticated identity to an institution context and a
//! membership role. Decoupled from HTTP and storage: the store plugs in through
//! [`TenancyDirectory`].

pub mod authorize;
pub mod claims;
pub mod membership;
pub mod principal;
pub mod roles;
pub mod tenancy;

pub use authorize::{ensure_administrator, ensure_role};
pub use claims::{IdentityProvider, SessionClaims, TokenValidationError, validate_claims};
pub use membership::{Membership, MembershipStatus};
pub use principal::{Identity, Institution, User};
pub use roles::{GlobalRole, MembershipRole, Role};
pub use tenancy::{
    TenancyContext, TenancyDirectory, TenancyError, TenancyOptions, resolve_tenancy, resolve_user,
};
