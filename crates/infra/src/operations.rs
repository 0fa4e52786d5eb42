//! Operation surface: every request-level query and mutation goes through here.
//!
//! ```text
//! identity
//!   ↓
//! 1. open a read snapshot (query) or a staged transaction (mutation)
//!   ↓
//! 2. resolve tenancy against that same view
//!   ↓
//! 3. run the handler with (ctx, args, tenancy)
//!   ↓
//! 4. commit staged writes only if the handler returned Ok
//! ```
//!
//! Handlers live in [`crate::handlers`] as `impl Operations` blocks.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use thiserror::Error;
use tracing::{Span, field, info_span, warn};

use astral_auth::{
    Identity, TenancyContext, TenancyError, TenancyOptions, User, resolve_tenancy, resolve_user,
};
use astral_core::{Clock, DomainError, DomainResult, local_date};
use astral_libro::{AcademicCalendar, LifecycleError, LifecycleGuard};

use crate::store::{Database, StoreError, Tables};

/// Chile continental standard time.
const DEFAULT_UTC_OFFSET_HOURS: i32 = -4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    #[error(transparent)]
    Lifecycle(LifecycleError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Missing, or owned by another institution. The two are never distinguished.
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl From<LifecycleError> for OperationError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Access(e) => OperationError::Tenancy(e),
            LifecycleError::Domain(e) => OperationError::Domain(e),
            LifecycleError::NotFound => OperationError::NotFound("record"),
            other => OperationError::Lifecycle(other),
        }
    }
}

impl OperationError {
    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            OperationError::Tenancy(e) => match e {
                TenancyError::Authentication => "authentication_required",
                TenancyError::UserNotFound => "user_not_found",
                TenancyError::InactiveUser => "inactive_user",
                TenancyError::NoInstitution => "no_institution",
                TenancyError::InstitutionNotFound(_) => "institution_not_found",
                TenancyError::MembershipRequired => "membership_required",
                TenancyError::MembershipInactive(_) => "membership_inactive",
                TenancyError::InsufficientRole { .. } => "insufficient_role",
            },
            OperationError::Lifecycle(e) => match e {
                LifecycleError::FutureDate { .. } => "future_date",
                LifecycleError::RecordLocked(_) => "record_locked",
                LifecycleError::RecordCertified(_) => "record_certified",
                LifecycleError::CertificationRequiresSignature(_) => "certification_requires_signature",
                LifecycleError::NotFound => "not_found",
                LifecycleError::Access(_) => "forbidden",
                LifecycleError::Domain(_) => "validation_error",
            },
            OperationError::Domain(e) => match e {
                DomainError::Validation(_) => "validation_error",
                DomainError::InvariantViolation(_) => "invariant_violation",
                DomainError::InvalidId(_) => "invalid_id",
                DomainError::Conflict(_) => "conflict",
            },
            OperationError::Store(_) => "store_unavailable",
            OperationError::NotFound(_) => "not_found",
        }
    }
}

pub type OperationResult<T> = Result<T, OperationError>;

/// Time-related settings shared by all operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSettings {
    /// Offset used to decide what "today" is.
    pub utc_offset: FixedOffset,
    pub calendar: AcademicCalendar,
}

impl OperationSettings {
    pub fn new(utc_offset_hours: i32, second_term_start_month: u32) -> DomainResult<Self> {
        if !(-23..=23).contains(&utc_offset_hours) {
            return Err(DomainError::validation(format!(
                "utc offset must be between -23 and 23 hours, got {utc_offset_hours}"
            )));
        }
        let utc_offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| DomainError::validation("invalid utc offset"))?;
        Ok(Self {
            utc_offset,
            calendar: AcademicCalendar::new(second_term_start_month)?,
        })
    }
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix()),
            calendar: AcademicCalendar::default(),
        }
    }
}

/// Read-only handler context.
pub struct QueryCtx<'a> {
    pub tables: &'a Tables,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub calendar: AcademicCalendar,
}

impl QueryCtx<'_> {
    pub fn guard(&self) -> LifecycleGuard<'_, Tables> {
        LifecycleGuard::new(self.tables, self.today)
    }
}

/// Transactional handler context. Writes go to the staged tables.
pub struct MutationCtx<'a> {
    pub tables: &'a mut Tables,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub calendar: AcademicCalendar,
}

impl MutationCtx<'_> {
    /// Guard over the staged tables; drop it before writing.
    pub fn guard(&self) -> LifecycleGuard<'_, Tables> {
        LifecycleGuard::new(&*self.tables, self.today)
    }
}

#[derive(Clone)]
pub struct Operations {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    settings: OperationSettings,
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Operations {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, settings: OperationSettings) -> Self {
        Self { db, clock, settings }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn settings(&self) -> OperationSettings {
        self.settings
    }

    fn instant(&self) -> (DateTime<Utc>, NaiveDate) {
        let now = self.clock.now();
        (now, local_date(now, self.settings.utc_offset))
    }

    /// Resolve tenancy, then run `handler` against a read snapshot.
    pub fn tenant_query<A, R>(
        &self,
        name: &'static str,
        identity: Option<&Identity>,
        options: &TenancyOptions,
        args: A,
        handler: impl FnOnce(&QueryCtx<'_>, A, &TenancyContext) -> OperationResult<R>,
    ) -> OperationResult<R> {
        let span = operation_span("query", name);
        let _entered = span.enter();
        let (now, today) = self.instant();

        let result = self.db.read(|tables| {
            let tenancy = resolve_tenancy(tables, identity, options)?;
            record_tenancy(&span, &tenancy);
            let ctx = QueryCtx {
                tables,
                now,
                today,
                calendar: self.settings.calendar,
            };
            handler(&ctx, args, &tenancy)
        });
        log_outcome(result.map_err(OperationError::from).and_then(|r| r))
    }

    /// Resolve tenancy, then run `handler` inside one store transaction.
    ///
    /// Nothing the handler staged is kept unless it returns `Ok`.
    pub fn tenant_mutation<A, R>(
        &self,
        name: &'static str,
        identity: Option<&Identity>,
        options: &TenancyOptions,
        args: A,
        handler: impl FnOnce(&mut MutationCtx<'_>, A, &TenancyContext) -> OperationResult<R>,
    ) -> OperationResult<R> {
        let span = operation_span("mutation", name);
        let _entered = span.enter();
        let (now, today) = self.instant();

        let result = self.db.transaction(|tables| {
            let tenancy = resolve_tenancy(&*tables, identity, options)?;
            record_tenancy(&span, &tenancy);
            let mut ctx = MutationCtx {
                tables,
                now,
                today,
                calendar: self.settings.calendar,
            };
            handler(&mut ctx, args, &tenancy)
        });
        log_outcome(result)
    }

    /// Mutation that only needs the caller's user (no institution yet).
    pub fn user_mutation<A, R>(
        &self,
        name: &'static str,
        identity: Option<&Identity>,
        args: A,
        handler: impl FnOnce(&mut MutationCtx<'_>, A, &User) -> OperationResult<R>,
    ) -> OperationResult<R> {
        let span = operation_span("mutation", name);
        let _entered = span.enter();
        let (now, today) = self.instant();

        let result = self.db.transaction(|tables| {
            let user = resolve_user(&*tables, identity)?;
            span.record("user_id", field::display(user.id));
            let mut ctx = MutationCtx {
                tables,
                now,
                today,
                calendar: self.settings.calendar,
            };
            handler(&mut ctx, args, &user)
        });
        log_outcome(result)
    }

    /// Mutation keyed on the raw session identity (user registration).
    pub fn session_mutation<A, R>(
        &self,
        name: &'static str,
        identity: Option<&Identity>,
        args: A,
        handler: impl FnOnce(&mut MutationCtx<'_>, A, &Identity) -> OperationResult<R>,
    ) -> OperationResult<R> {
        let span = operation_span("mutation", name);
        let _entered = span.enter();
        let (now, today) = self.instant();

        let result = self.db.transaction(|tables| {
            let identity = identity.ok_or(TenancyError::Authentication)?;
            let mut ctx = MutationCtx {
                tables,
                now,
                today,
                calendar: self.settings.calendar,
            };
            handler(&mut ctx, args, identity)
        });
        log_outcome(result)
    }
}

fn operation_span(kind: &'static str, name: &'static str) -> Span {
    info_span!(
        "operation",
        kind = kind,
        op = name,
        tenant_id = field::Empty,
        user_id = field::Empty,
        role = field::Empty,
    )
}

fn record_tenancy(span: &Span, tenancy: &TenancyContext) {
    span.record("tenant_id", field::display(tenancy.institution_id()));
    span.record("user_id", field::display(tenancy.user_id()));
    span.record("role", tenancy.membership_role.as_str());
}

fn log_outcome<R>(result: OperationResult<R>) -> OperationResult<R> {
    if let Err(err) = &result {
        match err {
            OperationError::Store(_) => tracing::error!(error = %err, "operation failed"),
            _ => warn!(code = err.code(), error = %err, "operation rejected"),
        }
    }
    result
}
