//! Operation handlers, grouped by concern.
//!
//! Each file adds an `impl Operations` block; the handler bodies are thin and
//! defer every rule to the resolver, the role gate and the lifecycle guard.

pub mod certifications;
pub mod locks;
pub mod memberships;
pub mod records;
pub mod signatures;

use astral_auth::TenancyContext;
use astral_core::{RecordId, find_by_id};
use astral_libro::ComplianceRecord;

use crate::operations::{OperationError, OperationResult};
use crate::store::Tables;

/// A record of the caller's institution. Foreign and missing records look the same.
pub(crate) fn load_record(
    tables: &Tables,
    tenancy: &TenancyContext,
    record_id: RecordId,
) -> OperationResult<ComplianceRecord> {
    find_by_id(&tables.records, record_id)
        .filter(|r| r.institution_id == tenancy.institution_id())
        .cloned()
        .ok_or(OperationError::not_found("record"))
}
