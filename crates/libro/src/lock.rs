use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use astral_core::{CourseId, DomainError, Entity, InstitutionId, LockId, UserId};

use crate::{LockTarget, Period, RecordType};

/// Administrative freeze over (institution, course, period, target).
///
/// A business lock stored as data, not a concurrency primitive. While
/// `is_locked` holds, every write to a matching record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLock {
    pub id: LockId,
    pub institution_id: InstitutionId,
    pub course_id: CourseId,
    pub period: Period,
    pub target: LockTarget,
    pub is_locked: bool,
    pub locked_by: UserId,
    pub locked_at: DateTime<Utc>,
    pub unlocked_by: Option<UserId>,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl RecordLock {
    pub fn lock(
        institution_id: InstitutionId,
        course_id: CourseId,
        period: Period,
        target: LockTarget,
        locked_by: UserId,
        locked_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: LockId::new(),
            institution_id,
            course_id,
            period,
            target,
            is_locked: true,
            locked_by,
            locked_at,
            unlocked_by: None,
            unlocked_at: None,
            reason: reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
        }
    }

    pub fn applies_to(&self, course_id: CourseId, period: Period, record_type: RecordType) -> bool {
        self.is_locked
            && self.course_id == course_id
            && self.period == period
            && self.target.covers(record_type)
    }

    /// Release the lock. Each lock row can be released once.
    pub fn unlock(&mut self, by: UserId, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_locked {
            return Err(DomainError::invariant("lock already released"));
        }
        self.is_locked = false;
        self.unlocked_by = Some(by);
        self.unlocked_at = Some(at);
        Ok(())
    }
}

impl Entity for RecordLock {
    type Id = LockId;

    fn id(&self) -> LockId {
        self.id
    }
}
