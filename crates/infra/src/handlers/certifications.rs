//! Certification rows are append-only. A scope's effective status is its latest
//! row; rejecting or reopening appends, it never edits a prior row.

use serde::Deserialize;
use tracing::info;

use astral_auth::{Identity, Role, TenancyContext, TenancyOptions};
use astral_core::{CourseId, DomainError, RecordId};
use astral_libro::{
    CertificationScope, CertificationStatus, CertificationType, LockTarget, Period,
    RecordCertification,
};

use super::load_record;
use crate::operations::{MutationCtx, OperationError, OperationResult, Operations};
use crate::store::Tables;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CertifyRecord {
    pub record_id: RecordId,
    pub certification_type: CertificationType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CertifyPeriod {
    pub course_id: CourseId,
    pub period: Period,
    pub target: LockTarget,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Reject or reopen an existing scope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewCertification {
    pub scope: CertificationScope,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Operations {
    /// The author asks an administrator to certify a signed record.
    pub fn request_certification(
        &self,
        identity: Option<&Identity>,
        args: CertifyRecord,
    ) -> OperationResult<RecordCertification> {
        self.tenant_mutation(
            "request_certification",
            identity,
            &TenancyOptions::members(),
            args,
            |tx, args, tenancy| {
                let record = load_record(tx.tables, tenancy, args.record_id)?;
                tx.guard().check_request_certification(tenancy, &record)?;

                let scope = CertificationScope::Record {
                    record_type: record.record_type,
                    record_id: record.id,
                };
                if let Some(pending) = effective(tx.tables, tenancy, &scope)
                    .filter(|c| c.status == CertificationStatus::Pending)
                {
                    return Ok(pending);
                }
                Ok(append(tx, tenancy, scope, args.certification_type, CertificationStatus::Pending, args.notes))
            },
        )
    }

    /// SIGNED -> CERTIFIED for one record.
    pub fn certify_record(&self, identity: Option<&Identity>, args: CertifyRecord) -> OperationResult<RecordCertification> {
        self.tenant_mutation(
            "certify_record",
            identity,
            &TenancyOptions::members(),
            args,
            |tx, args, tenancy| {
                let record = load_record(tx.tables, tenancy, args.record_id)?;
                tx.guard().check_certify(tenancy, &record)?;

                let scope = CertificationScope::Record {
                    record_type: record.record_type,
                    record_id: record.id,
                };
                Ok(append(tx, tenancy, scope, args.certification_type, CertificationStatus::Certified, args.notes))
            },
        )
    }

    /// Certify every record of a (course, period, target) scope at once.
    pub fn certify_period(&self, identity: Option<&Identity>, args: CertifyPeriod) -> OperationResult<RecordCertification> {
        self.tenant_mutation(
            "certify_period",
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            args,
            |tx, args, tenancy| {
                let records = tx
                    .tables
                    .course_records(tenancy.institution_id(), args.course_id, Some(args.period))
                    .into_iter()
                    .filter(|r| args.target.covers(r.record_type));
                tx.guard()
                    .check_certify_period(tenancy, args.course_id, args.period, args.target, records)?;

                let scope = CertificationScope::Period {
                    course_id: args.course_id,
                    period: args.period,
                    target: args.target,
                };
                Ok(append(tx, tenancy, scope, CertificationType::PeriodClosure, CertificationStatus::Certified, args.notes))
            },
        )
    }

    /// Decline a pending request.
    pub fn reject_certification(
        &self,
        identity: Option<&Identity>,
        args: ReviewCertification,
    ) -> OperationResult<RecordCertification> {
        self.tenant_mutation(
            "reject_certification",
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            args,
            |tx, args, tenancy| {
                let current = effective(tx.tables, tenancy, &args.scope)
                    .ok_or(OperationError::not_found("certification"))?;
                if current.status != CertificationStatus::Pending {
                    return Err(DomainError::conflict(format!(
                        "only a PENDING certification can be rejected, scope is {}",
                        current.status
                    ))
                    .into());
                }
                Ok(append(tx, tenancy, args.scope, current.certification_type, CertificationStatus::Rejected, args.notes))
            },
        )
    }

    /// Lift a certification by appending an audited `Reopened` row. Notes are mandatory.
    pub fn reopen_certification(
        &self,
        identity: Option<&Identity>,
        args: ReviewCertification,
    ) -> OperationResult<RecordCertification> {
        self.tenant_mutation(
            "reopen_certification",
            identity,
            &TenancyOptions::roles(Role::ADMINISTRATIVE),
            args,
            |tx, args, tenancy| {
                let notes = args
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| DomainError::validation("reopening a certification requires notes"))?
                    .to_string();

                let current = effective(tx.tables, tenancy, &args.scope)
                    .ok_or(OperationError::not_found("certification"))?;
                if current.status != CertificationStatus::Certified {
                    return Err(DomainError::conflict(format!(
                        "only a CERTIFIED scope can be reopened, scope is {}",
                        current.status
                    ))
                    .into());
                }

                // A locked scope stays frozen, certified or not.
                let (course_id, period, target) = match args.scope {
                    CertificationScope::Record { record_id, .. } => {
                        let record = load_record(tx.tables, tenancy, record_id)?;
                        (record.course_id, record.period, LockTarget::Only(record.record_type))
                    }
                    CertificationScope::Period {
                        course_id,
                        period,
                        target,
                    } => (course_id, period, target),
                };
                tx.guard().ensure_unlocked(tenancy, course_id, period, target)?;

                Ok(append(tx, tenancy, args.scope, current.certification_type, CertificationStatus::Reopened, Some(notes)))
            },
        )
    }

    /// Full history of one scope, in append order.
    pub fn list_certifications(
        &self,
        identity: Option<&Identity>,
        scope: CertificationScope,
    ) -> OperationResult<Vec<RecordCertification>> {
        self.tenant_query(
            "list_certifications",
            identity,
            &TenancyOptions::members(),
            scope,
            |q, scope, tenancy| {
                if let CertificationScope::Record { record_id, .. } = scope {
                    load_record(q.tables, tenancy, record_id)?;
                }
                Ok(q.tables
                    .certification_history(tenancy.institution_id(), &scope)
                    .into_iter()
                    .cloned()
                    .collect())
            },
        )
    }
}

fn effective(tables: &Tables, tenancy: &TenancyContext, scope: &CertificationScope) -> Option<RecordCertification> {
    tables
        .certification_history(tenancy.institution_id(), scope)
        .last()
        .map(|c| (*c).clone())
}

fn append(
    tx: &mut MutationCtx<'_>,
    tenancy: &TenancyContext,
    scope: CertificationScope,
    certification_type: CertificationType,
    status: CertificationStatus,
    notes: Option<String>,
) -> RecordCertification {
    let row = RecordCertification::entry(
        tenancy.institution_id(),
        scope,
        certification_type,
        status,
        tenancy.user_id(),
        tx.now,
        notes,
    );
    info!(
        certification_id = %row.id,
        scope = ?row.scope,
        status = %row.status,
        "certification row appended"
    );
    tx.tables.certifications.push(row.clone());
    row
}
