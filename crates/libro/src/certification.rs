//! Record certifications.
//!
//! Rows are append-only. The status that counts for a scope is the status of
//! its most recent row, so reopening or rejecting is a new row, never an edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use astral_core::{CertificationId, CourseId, Entity, InstitutionId, RecordId, UserId};

use crate::{LockTarget, Period, RecordType};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationType {
    Daily,
    Weekly,
    Monthly,
    PeriodClosure,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationStatus {
    Pending,
    Certified,
    Rejected,
    /// A previously certified scope re-opened by an administrator.
    Reopened,
}

impl core::fmt::Display for CertificationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            CertificationStatus::Pending => "PENDING",
            CertificationStatus::Certified => "CERTIFIED",
            CertificationStatus::Rejected => "REJECTED",
            CertificationStatus::Reopened => "REOPENED",
        };
        f.write_str(s)
    }
}

/// What a certification row attests to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationScope {
    Record {
        record_type: RecordType,
        record_id: RecordId,
    },
    Period {
        course_id: CourseId,
        period: Period,
        target: LockTarget,
    },
}

impl CertificationScope {
    pub fn covers_period(&self, course_id: CourseId, period: Period, record_type: RecordType) -> bool {
        match self {
            CertificationScope::Period {
                course_id: c,
                period: p,
                target,
            } => *c == course_id && *p == period && target.covers(record_type),
            CertificationScope::Record { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCertification {
    pub id: CertificationId,
    pub institution_id: InstitutionId,
    pub scope: CertificationScope,
    pub certification_type: CertificationType,
    pub status: CertificationStatus,
    /// Actor who appended this row (certifier, rejecter, re-opener or requester).
    pub certified_by: UserId,
    pub certified_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl RecordCertification {
    pub fn entry(
        institution_id: InstitutionId,
        scope: CertificationScope,
        certification_type: CertificationType,
        status: CertificationStatus,
        actor: UserId,
        at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: CertificationId::new(),
            institution_id,
            scope,
            certification_type,
            status,
            certified_by: actor,
            certified_at: at,
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        }
    }
}

impl Entity for RecordCertification {
    type Id = CertificationId;

    fn id(&self) -> CertificationId {
        self.id
    }
}

/// Latest row per distinct scope, in first-seen order.
///
/// `rows` must be in append order.
pub fn effective_rows<'a, I>(rows: I) -> Vec<&'a RecordCertification>
where
    I: IntoIterator<Item = &'a RecordCertification>,
{
    let mut latest: Vec<&RecordCertification> = Vec::new();
    for row in rows {
        match latest.iter_mut().find(|r| r.scope == row.scope) {
            Some(slot) => *slot = row,
            None => latest.push(row),
        }
    }
    latest
}

/// First scope whose latest row is `Certified`.
pub fn find_effective_certification<'a, I>(rows: I) -> Option<&'a RecordCertification>
where
    I: IntoIterator<Item = &'a RecordCertification>,
{
    effective_rows(rows)
        .into_iter()
        .find(|r| r.status == CertificationStatus::Certified)
}
