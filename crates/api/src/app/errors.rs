use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use astral_auth::TenancyError;
use astral_core::DomainError;
use astral_infra::{OperationError, OperationResult};
use astral_libro::LifecycleError;

pub fn operation_error_to_response(err: OperationError) -> axum::response::Response {
    let status = match &err {
        OperationError::Tenancy(e) => match e {
            TenancyError::Authentication => StatusCode::UNAUTHORIZED,
            TenancyError::InstitutionNotFound(_) => StatusCode::NOT_FOUND,
            TenancyError::NoInstitution => StatusCode::CONFLICT,
            TenancyError::UserNotFound
            | TenancyError::InactiveUser
            | TenancyError::MembershipRequired
            | TenancyError::MembershipInactive(_)
            | TenancyError::InsufficientRole { .. } => StatusCode::FORBIDDEN,
        },
        OperationError::Lifecycle(e) => match e {
            LifecycleError::FutureDate { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::RecordLocked(_) => StatusCode::LOCKED,
            LifecycleError::RecordCertified(_) | LifecycleError::CertificationRequiresSignature(_) => {
                StatusCode::CONFLICT
            }
            LifecycleError::NotFound => StatusCode::NOT_FOUND,
            LifecycleError::Access(_) => StatusCode::FORBIDDEN,
            LifecycleError::Domain(_) => StatusCode::BAD_REQUEST,
        },
        OperationError::Domain(e) => match e {
            DomainError::Validation(_) | DomainError::InvalidId(_) => {
                StatusCode::BAD_REQUEST
            }
            DomainError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
        },
        OperationError::NotFound(_) => StatusCode::NOT_FOUND,
        OperationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.code(), err.to_string())
}

/// Serialize `result` with `status` on success, or map the error.
pub fn respond<T: Serialize>(status: StatusCode, result: OperationResult<T>) -> axum::response::Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(e) => operation_error_to_response(e),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}
