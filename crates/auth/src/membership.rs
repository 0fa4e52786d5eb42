//! Membership: a user's role assignment within one institution.
//!
//! At most one membership exists per (user, institution) pair. Only an
//! `Active` membership grants institution-scoped permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use astral_core::{DomainError, Entity, InstitutionId, MembershipId, UserId};

use crate::MembershipRole;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Invited,
    Active,
    Suspended,
    Left,
}

impl core::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            MembershipStatus::Invited => "INVITED",
            MembershipStatus::Active => "ACTIVE",
            MembershipStatus::Suspended => "SUSPENDED",
            MembershipStatus::Left => "LEFT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub institution_id: InstitutionId,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub invited_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// A pending invitation; grants nothing until accepted.
    pub fn invite(
        user_id: UserId,
        institution_id: InstitutionId,
        role: MembershipRole,
        invited_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipId::new(),
            user_id,
            institution_id,
            role,
            status: MembershipStatus::Invited,
            invited_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Membership created already active (e.g. the founder of an institution).
    pub fn founding(
        user_id: UserId,
        institution_id: InstitutionId,
        role: MembershipRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: MembershipStatus::Active,
            ..Self::invite(user_id, institution_id, role, None, now)
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    /// Invited -> Active.
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(MembershipStatus::Invited, MembershipStatus::Active, now)
    }

    /// Active -> Suspended.
    pub fn suspend(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(MembershipStatus::Active, MembershipStatus::Suspended, now)
    }

    /// Suspended -> Active.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(MembershipStatus::Suspended, MembershipStatus::Active, now)
    }

    /// Any non-terminal status -> Left.
    pub fn leave(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status == MembershipStatus::Left {
            return Err(DomainError::invariant("membership already left"));
        }
        self.status = MembershipStatus::Left;
        self.updated_at = now;
        Ok(())
    }

    /// Left -> Invited, reusing the row so the (user, institution) pair stays unique.
    pub fn reinvite(
        &mut self,
        role: MembershipRole,
        invited_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != MembershipStatus::Left {
            return Err(DomainError::conflict(format!(
                "user already has a {} membership in this institution",
                self.status
            )));
        }
        self.role = role;
        self.invited_by = invited_by;
        self.status = MembershipStatus::Invited;
        self.updated_at = now;
        Ok(())
    }

    fn transition(
        &mut self,
        from: MembershipStatus,
        to: MembershipStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != from {
            return Err(DomainError::invariant(format!(
                "membership is {}, expected {from}",
                self.status
            )));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Membership {
    type Id = MembershipId;

    fn id(&self) -> MembershipId {
        self.id
    }
}
