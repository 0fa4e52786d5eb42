use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use astral_core::{DomainError, Entity, InstitutionId, UserId};

use crate::GlobalRole;

/// What the identity provider vouches for on a request.
///
/// The subject is the external-auth id; it is resolved to a [`User`] by the
/// tenancy resolver on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Platform user.
///
/// Never hard-deleted; deactivation flips `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Subject id issued by the identity provider (unique).
    pub external_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub global_role: GlobalRole,
    /// Per-session tenant selection, resolved fresh on each request.
    pub current_institution_id: Option<InstitutionId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(
        external_id: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let external_id = external_id.into();
        if external_id.trim().is_empty() {
            return Err(DomainError::validation("external id cannot be empty"));
        }

        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        let email = match email {
            Some(e) if e.trim().is_empty() || !e.contains('@') => {
                return Err(DomainError::validation("invalid email format"));
            }
            Some(e) => Some(e.trim().to_lowercase()),
            None => None,
        };

        Ok(Self {
            id: UserId::new(),
            external_id,
            display_name: display_name.trim().to_string(),
            email,
            is_active: true,
            global_role: GlobalRole::User,
            current_institution_id: None,
            created_at: now,
        })
    }

    pub fn is_master(&self) -> bool {
        self.global_role == GlobalRole::Master
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// A school: the tenant boundary every domain row points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    /// Ministry school id (RBD), when known.
    pub rbd: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Institution {
    pub fn register(
        name: impl Into<String>,
        rbd: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("institution name cannot be empty"));
        }

        Ok(Self {
            id: InstitutionId::new(),
            name: name.trim().to_string(),
            rbd: rbd.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            created_at: now,
        })
    }
}

impl Entity for Institution {
    type Id = InstitutionId;

    fn id(&self) -> InstitutionId {
        self.id
    }
}
