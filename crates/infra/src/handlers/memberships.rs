//! Users, institutions and memberships.

use serde::{Deserialize, Serialize};
use tracing::info;

use astral_auth::{
    Identity, Institution, Membership, MembershipRole, MembershipStatus, Role, TenancyContext,
    TenancyDirectory, TenancyError, TenancyOptions, User,
};
use astral_core::{DomainError, InstitutionId, MembershipId, UserId, find_by_id_mut};

use crate::operations::{OperationError, OperationResult, Operations};
use crate::store::Tables;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterUser {
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterInstitution {
    pub name: String,
    #[serde(default)]
    pub rbd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InviteMember {
    pub email: String,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SetUserActive {
    pub user_id: UserId,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub membership: Membership,
    pub display_name: String,
    pub email: Option<String>,
}

impl Operations {
    /// First login: create the user row for the session subject.
    pub fn register_user(&self, identity: Option<&Identity>, args: RegisterUser) -> OperationResult<User> {
        self.session_mutation("register_user", identity, args, |tx, args, identity| {
            if tx.tables.user_by_external_id(&identity.subject).is_some() {
                return Err(DomainError::conflict("user already registered").into());
            }
            let user = User::register(identity.subject.clone(), args.display_name, args.email, tx.now)?;
            if let Some(email) = &user.email {
                if tx.tables.user_by_email(email).is_some() {
                    return Err(DomainError::conflict("email already in use").into());
                }
            }

            info!(user_id = %user.id, "user registered");
            tx.tables.users.push(user.clone());
            Ok(user)
        })
    }

    /// Create an institution with the caller as its first administrator.
    pub fn register_institution(
        &self,
        identity: Option<&Identity>,
        args: RegisterInstitution,
    ) -> OperationResult<Institution> {
        self.user_mutation("register_institution", identity, args, |tx, args, user| {
            let institution = Institution::register(args.name, args.rbd, tx.now)?;
            let membership = Membership::founding(user.id, institution.id, MembershipRole::Admin, tx.now);

            info!(
                institution_id = %institution.id,
                membership_id = %membership.id,
                "institution registered"
            );
            tx.tables.institutions.push(institution.clone());
            tx.tables.memberships.push(membership);
            user_mut(tx.tables, user.id)?.current_institution_id = Some(institution.id);
            Ok(institution)
        })
    }

    /// Invite a registered user by email. A user who left may be invited again.
    pub fn invite_member(&self, identity: Option<&Identity>, args: InviteMember) -> OperationResult<Membership> {
        self.tenant_mutation(
            "invite_member",
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            args,
            |tx, args, tenancy| {
                let invitee = tx
                    .tables
                    .user_by_email(&args.email)
                    .map(|u| u.id)
                    .ok_or(OperationError::not_found("user"))?;
                let inviter = Some(tenancy.user_id());

                let existing = tx
                    .tables
                    .memberships
                    .iter_mut()
                    .find(|m| m.user_id == invitee && m.institution_id == tenancy.institution_id());
                let membership = match existing {
                    Some(m) => {
                        m.reinvite(args.role, inviter, tx.now)?;
                        m.clone()
                    }
                    None => {
                        let m = Membership::invite(invitee, tenancy.institution_id(), args.role, inviter, tx.now);
                        tx.tables.memberships.push(m.clone());
                        m
                    }
                };

                info!(membership_id = %membership.id, invitee = %invitee, role = %membership.role, "member invited");
                Ok(membership)
            },
        )
    }

    /// Accept a pending invitation and make that institution current.
    pub fn accept_invitation(
        &self,
        identity: Option<&Identity>,
        institution_id: InstitutionId,
    ) -> OperationResult<Membership> {
        self.user_mutation("accept_invitation", identity, institution_id, |tx, institution_id, user| {
            let membership = tx
                .tables
                .memberships
                .iter_mut()
                .find(|m| m.user_id == user.id && m.institution_id == institution_id)
                .ok_or(OperationError::not_found("invitation"))?;
            membership.accept(tx.now)?;
            let membership = membership.clone();

            user_mut(tx.tables, user.id)?.current_institution_id = Some(institution_id);
            info!(membership_id = %membership.id, "invitation accepted");
            Ok(membership)
        })
    }

    pub fn suspend_member(&self, identity: Option<&Identity>, membership_id: MembershipId) -> OperationResult<Membership> {
        self.administer_membership("suspend_member", identity, membership_id, |m, now| m.suspend(now))
    }

    pub fn reactivate_member(&self, identity: Option<&Identity>, membership_id: MembershipId) -> OperationResult<Membership> {
        self.administer_membership("reactivate_member", identity, membership_id, |m, now| m.reactivate(now))
    }

    fn administer_membership(
        &self,
        name: &'static str,
        identity: Option<&Identity>,
        membership_id: MembershipId,
        change: impl FnOnce(&mut Membership, chrono::DateTime<chrono::Utc>) -> Result<(), DomainError>,
    ) -> OperationResult<Membership> {
        self.tenant_mutation(
            name,
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            membership_id,
            |tx, membership_id, tenancy| {
                let membership = find_by_id_mut(&mut tx.tables.memberships, membership_id)
                    .filter(|m| m.institution_id == tenancy.institution_id())
                    .ok_or(OperationError::not_found("membership"))?;
                if membership.user_id == tenancy.user_id() {
                    return Err(DomainError::conflict("administrators cannot change their own membership").into());
                }
                change(membership, tx.now)?;

                info!(membership_id = %membership.id, status = %membership.status, "membership changed");
                Ok(membership.clone())
            },
        )
    }

    /// Leave the current institution.
    pub fn leave_institution(&self, identity: Option<&Identity>) -> OperationResult<Membership> {
        self.tenant_mutation(
            "leave_institution",
            identity,
            &TenancyOptions::members(),
            (),
            |tx, (), tenancy| {
                let membership_id = tenancy
                    .membership
                    .as_ref()
                    .map(|m| m.id)
                    .ok_or(TenancyError::MembershipRequired)?;
                let membership = find_by_id_mut(&mut tx.tables.memberships, membership_id)
                    .ok_or(OperationError::not_found("membership"))?;
                membership.leave(tx.now)?;
                let membership = membership.clone();

                let user = user_mut(tx.tables, tenancy.user_id())?;
                if user.current_institution_id == Some(tenancy.institution_id()) {
                    user.current_institution_id = None;
                }
                info!(membership_id = %membership.id, "left institution");
                Ok(membership)
            },
        )
    }

    /// Point the caller's session at another institution they belong to.
    pub fn switch_institution(&self, identity: Option<&Identity>, institution_id: InstitutionId) -> OperationResult<User> {
        self.user_mutation("switch_institution", identity, institution_id, |tx, institution_id, user| {
            if tx.tables.institution(institution_id).is_none() {
                return Err(OperationError::not_found("institution"));
            }
            if !user.is_master() {
                match tx.tables.membership(user.id, institution_id) {
                    None => return Err(TenancyError::MembershipRequired.into()),
                    Some(m) if matches!(m.status, MembershipStatus::Suspended | MembershipStatus::Left) => {
                        return Err(TenancyError::MembershipInactive(m.status).into());
                    }
                    Some(_) => {}
                }
            }

            let user = user_mut(tx.tables, user.id)?;
            user.current_institution_id = Some(institution_id);
            info!(institution_id = %institution_id, "current institution switched");
            Ok(user.clone())
        })
    }

    /// Enable or disable a user account. Master only; accounts are never deleted.
    ///
    /// Platform-wide, so no institution is resolved: a master without any
    /// membership can still use it.
    pub fn set_user_active(&self, identity: Option<&Identity>, args: SetUserActive) -> OperationResult<User> {
        self.user_mutation("set_user_active", identity, args, |tx, args, caller| {
            if !caller.is_master() {
                let actual = caller
                    .current_institution_id
                    .and_then(|institution_id| tx.tables.membership(caller.id, institution_id))
                    .map(|m| Role::from(m.role))
                    .unwrap_or(Role::Parent);
                return Err(TenancyError::insufficient_role(actual, &[Role::Master]).into());
            }
            if args.user_id == caller.id {
                return Err(DomainError::conflict("cannot change your own account status").into());
            }
            let user = user_mut(tx.tables, args.user_id)?;
            user.is_active = args.is_active;

            info!(target_user = %user.id, is_active = user.is_active, "user status changed");
            Ok(user.clone())
        })
    }

    /// Memberships of the current institution with their users.
    pub fn list_members(&self, identity: Option<&Identity>) -> OperationResult<Vec<MemberView>> {
        self.tenant_query(
            "list_members",
            identity,
            &TenancyOptions::roles([Role::Admin, Role::Staff, Role::Master]),
            (),
            |q, (), tenancy| {
                Ok(q.tables
                    .memberships_of_institution(tenancy.institution_id())
                    .into_iter()
                    .filter_map(|m| {
                        let user = q.tables.users.iter().find(|u| u.id == m.user_id)?;
                        Some(MemberView {
                            membership: m.clone(),
                            display_name: user.display_name.clone(),
                            email: user.email.clone(),
                        })
                    })
                    .collect())
            },
        )
    }

    /// The resolved tenancy for the caller.
    pub fn whoami(&self, identity: Option<&Identity>) -> OperationResult<TenancyContext> {
        self.tenant_query(
            "whoami",
            identity,
            &TenancyOptions::optional_membership(),
            (),
            |_, (), tenancy| Ok(tenancy.clone()),
        )
    }
}

fn user_mut(tables: &mut Tables, user_id: UserId) -> OperationResult<&mut User> {
    find_by_id_mut(&mut tables.users, user_id).ok_or(OperationError::not_found("user"))
}
