//! In-process document store.
//!
//! Stands in for the hosted document database: one table per entity, the
//! index paths the tenancy resolver and lifecycle guard query, and
//! transactional mutations.
//!
//! A mutation runs against a staged copy of the tables while holding the write
//! lock; the copy replaces the live tables only if the closure succeeds. That
//! gives each mutation atomicity (a rejected guard leaves nothing behind) and
//! serializes concurrent mutations, so guard checks and the write they protect
//! always see the same snapshot.

use std::sync::RwLock;

use thiserror::Error;

use astral_auth::{Institution, Membership, TenancyDirectory, User};
use astral_core::{CourseId, InstitutionId, RecordId, UserId};
use astral_libro::{
    CertificationScope, ComplianceLedger, ComplianceRecord, DigitalSignature, Period,
    RecordCertification, RecordLock, RecordType,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,
}

/// All tables, each in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: Vec<User>,
    pub institutions: Vec<Institution>,
    pub memberships: Vec<Membership>,
    pub records: Vec<ComplianceRecord>,
    pub signatures: Vec<DigitalSignature>,
    pub certifications: Vec<RecordCertification>,
    pub locks: Vec<RecordLock>,
}

impl Tables {
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let normalized = email.trim().to_lowercase();
        self.users
            .iter()
            .find(|u| u.email.as_deref() == Some(normalized.as_str()))
    }

    pub fn memberships_of_institution(&self, institution_id: InstitutionId) -> Vec<&Membership> {
        self.memberships
            .iter()
            .filter(|m| m.institution_id == institution_id)
            .collect()
    }

    /// signatures-by-(recordType, recordId)
    pub fn signatures_for(&self, record_type: RecordType, record_id: RecordId) -> Vec<&DigitalSignature> {
        self.signatures
            .iter()
            .filter(|s| s.record_type == record_type && s.record_id == record_id)
            .collect()
    }

    /// Records of one institution for a course, optionally narrowed to a period.
    pub fn course_records(
        &self,
        institution_id: InstitutionId,
        course_id: CourseId,
        period: Option<Period>,
    ) -> Vec<&ComplianceRecord> {
        self.records
            .iter()
            .filter(|r| {
                r.institution_id == institution_id
                    && r.course_id == course_id
                    && period.is_none_or(|p| r.period == p)
            })
            .collect()
    }

    /// Certification rows sharing `scope`, in append order.
    pub fn certification_history(
        &self,
        institution_id: InstitutionId,
        scope: &CertificationScope,
    ) -> Vec<&RecordCertification> {
        self.certifications
            .iter()
            .filter(|c| c.institution_id == institution_id && c.scope == *scope)
            .collect()
    }
}

impl TenancyDirectory for Tables {
    fn user_by_external_id(&self, external_id: &str) -> Option<User> {
        self.users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned()
    }

    fn institution(&self, id: InstitutionId) -> Option<Institution> {
        self.institutions.iter().find(|i| i.id == id).cloned()
    }

    fn membership(&self, user_id: UserId, institution_id: InstitutionId) -> Option<Membership> {
        self.memberships
            .iter()
            .find(|m| m.user_id == user_id && m.institution_id == institution_id)
            .cloned()
    }

    fn memberships_for_user(&self, user_id: UserId) -> Vec<Membership> {
        self.memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl ComplianceLedger for Tables {
    fn locks_for(&self, institution_id: InstitutionId, course_id: CourseId, period: Period) -> Vec<RecordLock> {
        self.locks
            .iter()
            .filter(|l| l.institution_id == institution_id && l.course_id == course_id && l.period == period)
            .cloned()
            .collect()
    }

    fn certifications_for_record(&self, record_type: RecordType, record_id: RecordId) -> Vec<RecordCertification> {
        let scope = CertificationScope::Record {
            record_type,
            record_id,
        };
        self.certifications
            .iter()
            .filter(|c| c.scope == scope)
            .cloned()
            .collect()
    }

    fn certifications_for_period(
        &self,
        institution_id: InstitutionId,
        course_id: CourseId,
        period: Period,
    ) -> Vec<RecordCertification> {
        self.certifications
            .iter()
            .filter(|c| {
                c.institution_id == institution_id
                    && matches!(
                        c.scope,
                        CertificationScope::Period { course_id: cc, period: p, .. }
                            if cc == course_id && p == period
                    )
            })
            .cloned()
            .collect()
    }
}

/// Transactional in-memory database.
#[derive(Debug, Default)]
pub struct Database {
    tables: RwLock<Tables>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded database (tests, fixtures).
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&tables))
    }

    /// Run `f` as one atomic mutation: committed on `Ok`, discarded on `Err`.
    pub fn transaction<R, E>(&self, f: impl FnOnce(&mut Tables) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut live = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let mut staged = live.clone();
        let out = f(&mut staged)?;
        *live = staged;
        Ok(out)
    }
}
