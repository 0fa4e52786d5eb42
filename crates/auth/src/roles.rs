use core::str::FromStr;

use serde::{Deserialize, Serialize};

use astral_core::DomainError;

/// Effective role of a caller inside one institution.
///
/// Closed set: every role check matches on this enum instead of comparing
/// free-form strings. `Master` is only ever produced by the global override,
/// never stored on a membership.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Profesor,
    Parent,
    Staff,
    Mentor,
    Master,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Profesor => "PROFESOR",
            Role::Parent => "PARENT",
            Role::Staff => "STAFF",
            Role::Mentor => "MENTOR",
            Role::Master => "MASTER",
        }
    }

    /// Roles allowed to administer an institution (certify, lock, manage members).
    pub const ADMINISTRATIVE: [Role; 2] = [Role::Admin, Role::Master];

    /// Roles allowed to author compliance records.
    pub const AUTHORS: [Role; 3] = [Role::Admin, Role::Profesor, Role::Master];
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "PROFESOR" => Ok(Role::Profesor),
            "PARENT" => Ok(Role::Parent),
            "STAFF" => Ok(Role::Staff),
            "MENTOR" => Ok(Role::Mentor),
            "MASTER" => Ok(Role::Master),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// Role stored on a membership row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipRole {
    Admin,
    Profesor,
    Parent,
    Staff,
    Mentor,
}

impl From<MembershipRole> for Role {
    fn from(value: MembershipRole) -> Self {
        match value {
            MembershipRole::Admin => Role::Admin,
            MembershipRole::Profesor => Role::Profesor,
            MembershipRole::Parent => Role::Parent,
            MembershipRole::Staff => Role::Staff,
            MembershipRole::Mentor => Role::Mentor,
        }
    }
}

impl TryFrom<Role> for MembershipRole {
    type Error = DomainError;

    fn try_from(value: Role) -> Result<Self, Self::Error> {
        match value {
            Role::Admin => Ok(MembershipRole::Admin),
            Role::Profesor => Ok(MembershipRole::Profesor),
            Role::Parent => Ok(MembershipRole::Parent),
            Role::Staff => Ok(MembershipRole::Staff),
            Role::Mentor => Ok(MembershipRole::Mentor),
            Role::Master => Err(DomainError::validation(
                "MASTER is a global role and cannot be granted through a membership",
            )),
        }
    }
}

impl core::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(Role::from(*self).as_str())
    }
}

/// Platform-wide role on the user record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalRole {
    #[default]
    User,
    /// Cross-institution override.
    Master,
}
