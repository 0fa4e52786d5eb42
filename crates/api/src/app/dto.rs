use serde::Deserialize;

use astral_core::InstitutionId;
use astral_libro::{CertificationType, LockTarget, Period, RecordBody};

// -------------------------
// Request DTOs
// -------------------------
//
// Bodies whose shape matches an operation argument deserialize straight into
// the `astral_infra` argument type; these cover routes that take part of the
// input from the path.

#[derive(Debug, Deserialize)]
pub struct UpdateRecordRequest {
    pub body: RecordBody,
}

#[derive(Debug, Deserialize)]
pub struct CertifyRecordRequest {
    pub certification_type: CertificationType,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwitchInstitutionRequest {
    pub institution_id: InstitutionId,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Query string selecting a period certification scope.
#[derive(Debug, Deserialize)]
pub struct PeriodScopeQuery {
    pub period: Period,
    pub target: LockTarget,
}
