//! Compliance records: the rows of the Libro de Clases.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use astral_core::{CourseId, DomainError, Entity, InstitutionId, RecordId, StudentId, UserId};

use crate::Period;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Attendance,
    ClassContent,
    Grade,
    Observation,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Attendance => "ATTENDANCE",
            RecordType::ClassContent => "CLASS_CONTENT",
            RecordType::Grade => "GRADE",
            RecordType::Observation => "OBSERVATION",
        }
    }
}

impl core::fmt::Display for RecordType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATTENDANCE" => Ok(RecordType::Attendance),
            "CLASS_CONTENT" => Ok(RecordType::ClassContent),
            "GRADE" => Ok(RecordType::Grade),
            "OBSERVATION" => Ok(RecordType::Observation),
            other => Err(DomainError::validation(format!("unknown record type '{other}'"))),
        }
    }
}

/// Which record types a lock or period certification covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum LockTarget {
    All,
    Only(RecordType),
}

impl LockTarget {
    pub fn covers(&self, record_type: RecordType) -> bool {
        match self {
            LockTarget::All => true,
            LockTarget::Only(t) => *t == record_type,
        }
    }
}

impl core::fmt::Display for LockTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LockTarget::All => f.write_str("ALL"),
            LockTarget::Only(t) => f.write_str(t.as_str()),
        }
    }
}

impl FromStr for LockTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(LockTarget::All),
            other => Ok(LockTarget::Only(other.parse()?)),
        }
    }
}

impl From<LockTarget> for String {
    fn from(value: LockTarget) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for LockTarget {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Justified,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationKind {
    Positive,
    Negative,
    Neutral,
}

/// Lowest and highest marks on the Chilean grading scale.
pub const MIN_GRADE: f64 = 1.0;
pub const MAX_GRADE: f64 = 7.0;

/// Type-specific payload of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordBody {
    Attendance {
        student_id: StudentId,
        status: AttendanceStatus,
    },
    ClassContent {
        content: String,
        #[serde(default)]
        objectives: Vec<String>,
    },
    Grade {
        student_id: StudentId,
        evaluation: String,
        value: f64,
    },
    Observation {
        student_id: StudentId,
        kind: ObservationKind,
        text: String,
    },
}

impl RecordBody {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordBody::Attendance { .. } => RecordType::Attendance,
            RecordBody::ClassContent { .. } => RecordType::ClassContent,
            RecordBody::Grade { .. } => RecordType::Grade,
            RecordBody::Observation { .. } => RecordType::Observation,
        }
    }

    pub fn student_id(&self) -> Option<StudentId> {
        match self {
            RecordBody::Attendance { student_id, .. }
            | RecordBody::Grade { student_id, .. }
            | RecordBody::Observation { student_id, .. } => Some(*student_id),
            RecordBody::ClassContent { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            RecordBody::Attendance { .. } => Ok(()),
            RecordBody::ClassContent { content, objectives } => {
                if content.trim().is_empty() {
                    return Err(DomainError::validation("class content cannot be empty"));
                }
                if objectives.iter().any(|o| o.trim().is_empty()) {
                    return Err(DomainError::validation("learning objective codes cannot be blank"));
                }
                Ok(())
            }
            RecordBody::Grade { evaluation, value, .. } => {
                if evaluation.trim().is_empty() {
                    return Err(DomainError::validation("evaluation name cannot be empty"));
                }
                if !(MIN_GRADE..=MAX_GRADE).contains(value) {
                    return Err(DomainError::validation(format!(
                        "grade {value} is outside the {MIN_GRADE:.1}-{MAX_GRADE:.1} scale"
                    )));
                }
                Ok(())
            }
            RecordBody::Observation { text, .. } => {
                if text.trim().is_empty() {
                    return Err(DomainError::validation("observation text cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

/// One entry in the class book.
///
/// `is_signed`/`signed_at` are set by the first signature and never touched
/// again; the signature rows themselves live in the signature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub id: RecordId,
    pub institution_id: InstitutionId,
    pub course_id: CourseId,
    pub record_type: RecordType,
    pub date: NaiveDate,
    pub period: Period,
    pub author_id: UserId,
    pub body: RecordBody,
    pub is_signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComplianceRecord {
    pub fn new(
        institution_id: InstitutionId,
        course_id: CourseId,
        date: NaiveDate,
        period: Period,
        author_id: UserId,
        body: RecordBody,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        body.validate()?;
        Ok(Self {
            id: RecordId::new(),
            institution_id,
            course_id,
            record_type: body.record_type(),
            date,
            period,
            author_id,
            body,
            is_signed: false,
            signed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn student_id(&self) -> Option<StudentId> {
        self.body.student_id()
    }

    /// Replace the payload; the record type cannot change.
    pub fn replace_body(&mut self, body: RecordBody, now: DateTime<Utc>) -> Result<(), DomainError> {
        if body.record_type() != self.record_type {
            return Err(DomainError::validation(format!(
                "cannot change a {} record into {}",
                self.record_type,
                body.record_type()
            )));
        }
        body.validate()?;
        self.body = body;
        self.updated_at = now;
        Ok(())
    }

    /// Mark signed. Returns `true` only for the first signature.
    pub fn mark_signed(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_signed {
            return false;
        }
        self.is_signed = true;
        self.signed_at = Some(at);
        true
    }
}

impl Entity for ComplianceRecord {
    type Id = RecordId;

    fn id(&self) -> RecordId {
        self.id
    }
}
