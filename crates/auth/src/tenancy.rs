//! Tenancy resolution: identity -> {user, institution, membership, role}.
//!
//! Every tenant-scoped operation runs [`resolve_tenancy`] before its handler
//! body and receives the resulting [`TenancyContext`]. The institution is
//! always derived here; a client-supplied institution id is never trusted.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use astral_core::{InstitutionId, UserId};

use crate::{Identity, Institution, Membership, MembershipStatus, Role, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenancyError {
    #[error("authentication required")]
    Authentication,

    #[error("user not found")]
    UserNotFound,

    #[error("user is inactive")]
    InactiveUser,

    #[error("no institution selected or available for this user")]
    NoInstitution,

    #[error("institution {0} not found")]
    InstitutionNotFound(InstitutionId),

    #[error("an institution membership is required")]
    MembershipRequired,

    #[error("membership is {0}, not ACTIVE")]
    MembershipInactive(MembershipStatus),

    #[error("role {actual} is not allowed (requires one of: {required})")]
    InsufficientRole { actual: Role, required: String },
}

impl TenancyError {
    pub fn insufficient_role(actual: Role, allowed: &[Role]) -> Self {
        let required = allowed
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self::InsufficientRole { actual, required }
    }
}

/// Index paths the resolver needs from the store.
pub trait TenancyDirectory {
    fn user_by_external_id(&self, external_id: &str) -> Option<User>;

    fn institution(&self, id: InstitutionId) -> Option<Institution>;

    fn membership(&self, user_id: UserId, institution_id: InstitutionId) -> Option<Membership>;

    /// All memberships of a user, in creation order.
    fn memberships_for_user(&self, user_id: UserId) -> Vec<Membership>;
}

/// Per-operation resolver options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyOptions {
    pub require_membership: bool,
    /// Empty means "any resolved caller".
    pub allowed_roles: Vec<Role>,
}

impl Default for TenancyOptions {
    fn default() -> Self {
        Self {
            require_membership: true,
            allowed_roles: Vec::new(),
        }
    }
}

impl TenancyOptions {
    pub fn members() -> Self {
        Self::default()
    }

    pub fn roles(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            require_membership: true,
            allowed_roles: allowed.into_iter().collect(),
        }
    }

    /// Resolve context without demanding an active membership.
    pub fn optional_membership() -> Self {
        Self {
            require_membership: false,
            allowed_roles: Vec::new(),
        }
    }
}

/// Resolved tenancy for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenancyContext {
    pub user: User,
    pub institution: Institution,
    pub membership: Option<Membership>,
    pub membership_role: Role,
    pub is_master: bool,
}

impl TenancyContext {
    pub fn institution_id(&self) -> InstitutionId {
        self.institution.id
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Active admin membership or master override.
    pub fn is_administrator(&self) -> bool {
        self.is_master
            || self
                .membership
                .as_ref()
                .is_some_and(|m| m.is_active() && m.role == crate::MembershipRole::Admin)
    }
}

/// Step one of resolution on its own: session -> active user.
///
/// Used directly by operations that act before any institution exists
/// (registration, accepting an invitation, switching institution).
pub fn resolve_user<D>(directory: &D, identity: Option<&Identity>) -> Result<User, TenancyError>
where
    D: TenancyDirectory + ?Sized,
{
    let identity = identity.ok_or(TenancyError::Authentication)?;
    let user = directory
        .user_by_external_id(&identity.subject)
        .ok_or(TenancyError::UserNotFound)?;
    if !user.is_active {
        return Err(TenancyError::InactiveUser);
    }
    Ok(user)
}

/// Resolve the tenancy context for `identity`.
pub fn resolve_tenancy<D>(
    directory: &D,
    identity: Option<&Identity>,
    options: &TenancyOptions,
) -> Result<TenancyContext, TenancyError>
where
    D: TenancyDirectory + ?Sized,
{
    let user = resolve_user(directory, identity)?;
    let is_master = user.is_master();

    let mut institution_id = user.current_institution_id;
    let mut membership = institution_id.and_then(|id| directory.membership(user.id, id));

    let needs_fallback = institution_id.is_none()
        || (membership.is_none() && !is_master && options.require_membership);
    if needs_fallback {
        let memberships = directory.memberships_for_user(user.id);
        let fallback = memberships
            .iter()
            .find(|m| m.status == MembershipStatus::Active)
            .or_else(|| {
                memberships
                    .iter()
                    .find(|m| m.status == MembershipStatus::Invited)
            });
        if let Some(m) = fallback {
            debug!(
                user_id = %user.id,
                institution_id = %m.institution_id,
                status = %m.status,
                "falling back to membership institution"
            );
            institution_id = Some(m.institution_id);
            membership = Some(m.clone());
        }
    }

    let institution_id = institution_id.ok_or(TenancyError::NoInstitution)?;
    let institution = directory
        .institution(institution_id)
        .ok_or(TenancyError::InstitutionNotFound(institution_id))?;

    if options.require_membership && !is_master {
        match &membership {
            None => return Err(TenancyError::MembershipRequired),
            Some(m) if m.status != MembershipStatus::Active => {
                return Err(TenancyError::MembershipInactive(m.status));
            }
            Some(_) => {}
        }
    }

    let membership_role = if is_master {
        Role::Master
    } else {
        membership
            .as_ref()
            .map(|m| Role::from(m.role))
            .unwrap_or(Role::Parent)
    };

    let ctx = TenancyContext {
        user,
        institution,
        membership,
        membership_role,
        is_master,
    };

    crate::ensure_role(&ctx, &options.allowed_roles, true)?;

    Ok(ctx)
}
