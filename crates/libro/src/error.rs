use chrono::NaiveDate;
use thiserror::Error;

use astral_auth::TenancyError;
use astral_core::{CertificationId, DomainError, LockId, RecordId};

/// Failures raised before a compliance write happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Access(#[from] TenancyError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Covers both "does not exist" and "belongs to another institution".
    #[error("not found")]
    NotFound,

    #[error("date {date} is after today ({today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    #[error("records in this scope are locked (lock {0})")]
    RecordLocked(LockId),

    #[error("record is certified (certification {0}) and can no longer be modified")]
    RecordCertified(CertificationId),

    #[error("record {0} must be signed before it can be certified")]
    CertificationRequiresSignature(RecordId),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
