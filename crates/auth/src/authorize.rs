use crate::{Role, TenancyContext, TenancyError};

/// Narrow role check over an already-resolved tenancy context.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
///
/// An empty `allowed` list always passes. The master override applies only
/// when `allow_master_override` is set and `Role::Master` is listed; otherwise
/// the caller needs an ACTIVE membership whose role is listed.
pub fn ensure_role(
    ctx: &TenancyContext,
    allowed: &[Role],
    allow_master_override: bool,
) -> Result<(), TenancyError> {
    if allowed.is_empty() {
        return Ok(());
    }

    if ctx.is_master && allow_master_override && allowed.contains(&Role::Master) {
        return Ok(());
    }

    match &ctx.membership {
        Some(m) if m.is_active() && allowed.contains(&Role::from(m.role)) => Ok(()),
        _ => Err(TenancyError::insufficient_role(ctx.membership_role, allowed)),
    }
}

/// Admin-or-master shorthand used by certification, lock and membership operations.
pub fn ensure_administrator(ctx: &TenancyContext) -> Result<(), TenancyError> {
    ensure_role(ctx, &Role::ADMINISTRATIVE, true)
}
