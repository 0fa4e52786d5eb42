//! Record lifecycle guard: the compliance write gate.
//!
//! Check order for an existing record:
//!
//! ```text
//! date not after today -> same institution -> author or admin -> no active lock -> not certified
//! ```
//!
//! Every check is a read; nothing is written here. Callers evaluate the guard
//! inside the transaction that performs the protected write.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use astral_auth::{Role, TenancyContext, TenancyError, ensure_administrator, ensure_role};
use astral_core::CourseId;

use crate::certification::find_effective_certification;
use crate::{
    CertificationScope, ComplianceLedger, ComplianceRecord, LifecycleError, LifecycleResult,
    LockTarget, Period, RecordCertification,
};

/// Derived lifecycle state of a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Open,
    Signed,
    Certified,
    /// Orthogonal freeze; reported in preference to the other three.
    Locked,
}

pub fn ensure_not_future(date: NaiveDate, today: NaiveDate) -> LifecycleResult<()> {
    if date > today {
        return Err(LifecycleError::FutureDate { date, today });
    }
    Ok(())
}

pub fn ensure_same_institution(ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
    if record.institution_id != ctx.institution_id() {
        return Err(LifecycleError::NotFound);
    }
    Ok(())
}

pub fn ensure_author_or_administrator(ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
    if record.author_id == ctx.user_id() || ctx.is_administrator() {
        return Ok(());
    }
    Err(TenancyError::insufficient_role(ctx.membership_role, &Role::ADMINISTRATIVE).into())
}

/// Whether two lock/certification targets can cover a common record type.
pub fn targets_overlap(a: LockTarget, b: LockTarget) -> bool {
    match (a, b) {
        (LockTarget::All, _) | (_, LockTarget::All) => true,
        (LockTarget::Only(x), LockTarget::Only(y)) => x == y,
    }
}

pub struct LifecycleGuard<'a, L: ?Sized> {
    ledger: &'a L,
    today: NaiveDate,
}

impl<'a, L> LifecycleGuard<'a, L>
where
    L: ComplianceLedger + ?Sized,
{
    pub fn new(ledger: &'a L, today: NaiveDate) -> Self {
        Self { ledger, today }
    }

    /// Gate for a record about to be inserted.
    pub fn check_create(&self, ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
        ensure_not_future(record.date, self.today)?;
        ensure_same_institution(ctx, record)?;
        ensure_role(ctx, &Role::AUTHORS, true)?;
        self.ensure_unlocked(ctx, record.course_id, record.period, LockTarget::Only(record.record_type))?;
        self.ensure_not_certified(record)
    }

    /// Gate for editing an existing record.
    pub fn check_write(&self, ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
        ensure_not_future(record.date, self.today)?;
        ensure_same_institution(ctx, record)?;
        ensure_author_or_administrator(ctx, record)?;
        self.ensure_unlocked(ctx, record.course_id, record.period, LockTarget::Only(record.record_type))?;
        self.ensure_not_certified(record)
    }

    /// Gate for appending a signature. Only the author signs.
    pub fn check_sign(&self, ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
        ensure_same_institution(ctx, record)?;
        if record.author_id != ctx.user_id() {
            return Err(TenancyError::InsufficientRole {
                actual: ctx.membership_role,
                required: "record author".to_string(),
            }
            .into());
        }
        self.ensure_unlocked(ctx, record.course_id, record.period, LockTarget::Only(record.record_type))?;
        self.ensure_not_certified(record)
    }

    /// Gate for an author asking for certification.
    pub fn check_request_certification(&self, ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
        ensure_same_institution(ctx, record)?;
        ensure_author_or_administrator(ctx, record)?;
        self.ensure_unlocked(ctx, record.course_id, record.period, LockTarget::Only(record.record_type))?;
        self.ensure_not_certified(record)?;
        ensure_signed(record)
    }

    /// Gate for certifying a single record (SIGNED -> CERTIFIED).
    pub fn check_certify(&self, ctx: &TenancyContext, record: &ComplianceRecord) -> LifecycleResult<()> {
        ensure_same_institution(ctx, record)?;
        ensure_administrator(ctx)?;
        self.ensure_unlocked(ctx, record.course_id, record.period, LockTarget::Only(record.record_type))?;
        self.ensure_not_certified(record)?;
        ensure_signed(record)
    }

    /// Gate for certifying a whole (course, period, target) scope.
    ///
    /// `records` are the records the scope covers; each must already be signed.
    pub fn check_certify_period<'r, I>(
        &self,
        ctx: &TenancyContext,
        course_id: CourseId,
        period: Period,
        target: LockTarget,
        records: I,
    ) -> LifecycleResult<()>
    where
        I: IntoIterator<Item = &'r ComplianceRecord>,
    {
        ensure_administrator(ctx)?;
        self.ensure_unlocked(ctx, course_id, period, target)?;

        let scope = CertificationScope::Period {
            course_id,
            period,
            target,
        };
        let rows = self.ledger.certifications_for_period(ctx.institution_id(), course_id, period);
        if let Some(existing) = find_effective_certification(rows.iter().filter(|r| r.scope == scope)) {
            return Err(LifecycleError::RecordCertified(existing.id));
        }

        for record in records {
            ensure_same_institution(ctx, record)?;
            ensure_signed(record)?;
        }
        Ok(())
    }

    pub fn ensure_unlocked(
        &self,
        ctx: &TenancyContext,
        course_id: CourseId,
        period: Period,
        target: LockTarget,
    ) -> LifecycleResult<()> {
        let locks = self.ledger.locks_for(ctx.institution_id(), course_id, period);
        match locks
            .iter()
            .find(|l| l.is_locked && l.institution_id == ctx.institution_id() && targets_overlap(l.target, target))
        {
            Some(lock) => Err(LifecycleError::RecordLocked(lock.id)),
            None => Ok(()),
        }
    }

    /// Rejects when the record, or a period scope covering it, is effectively certified.
    pub fn ensure_not_certified(&self, record: &ComplianceRecord) -> LifecycleResult<()> {
        match certification_covering(self.ledger, record) {
            Some(c) => Err(LifecycleError::RecordCertified(c.id)),
            None => Ok(()),
        }
    }

    pub fn state(&self, record: &ComplianceRecord) -> RecordState {
        record_state(self.ledger, record)
    }
}

pub fn ensure_signed(record: &ComplianceRecord) -> LifecycleResult<()> {
    if !record.is_signed {
        return Err(LifecycleError::CertificationRequiresSignature(record.id));
    }
    Ok(())
}

/// The effective `Certified` row covering `record` directly or through its period.
pub fn certification_covering<L>(ledger: &L, record: &ComplianceRecord) -> Option<RecordCertification>
where
    L: ComplianceLedger + ?Sized,
{
    let direct = ledger.certifications_for_record(record.record_type, record.id);
    if let Some(c) = find_effective_certification(
        direct.iter().filter(|c| c.institution_id == record.institution_id),
    ) {
        return Some(c.clone());
    }

    let by_period = ledger.certifications_for_period(record.institution_id, record.course_id, record.period);
    let covering = by_period
        .iter()
        .filter(|c| c.scope.covers_period(record.course_id, record.period, record.record_type));
    find_effective_certification(covering).cloned()
}

/// Derive the state of `record` from its flags and the ledger.
pub fn record_state<L>(ledger: &L, record: &ComplianceRecord) -> RecordState
where
    L: ComplianceLedger + ?Sized,
{
    let locked = ledger
        .locks_for(record.institution_id, record.course_id, record.period)
        .iter()
        .any(|l| l.institution_id == record.institution_id && l.applies_to(record.course_id, record.period, record.record_type));
    if locked {
        return RecordState::Locked;
    }

    if certification_covering(ledger, record).is_some() {
        return RecordState::Certified;
    }

    if record.is_signed {
        RecordState::Signed
    } else {
        RecordState::Open
    }
}
