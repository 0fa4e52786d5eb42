use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use astral_core::{CourseId, SignatureId};
use astral_infra::{CertifyPeriod, Operations, ReviewCertification};
use astral_libro::CertificationScope;

use crate::app::{dto, errors};
use crate::context::Session;

pub fn router() -> Router {
    Router::new()
        .route("/signatures/:id/certify", post(certify_signature))
        .route("/certifications/period", post(certify_period))
        .route("/certifications/reject", post(reject_certification))
        .route("/certifications/reopen", post(reopen_certification))
        .route("/courses/:course_id/certifications", get(list_period_certifications))
}

pub async fn certify_signature(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let signature_id: SignatureId = match errors::parse_id(&id, "signature") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        ops.certify_signature(session.identity(), signature_id),
    )
}

pub async fn certify_period(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<CertifyPeriod>,
) -> Response {
    errors::respond(StatusCode::CREATED, ops.certify_period(session.identity(), body))
}

pub async fn reject_certification(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<ReviewCertification>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        ops.reject_certification(session.identity(), body),
    )
}

pub async fn reopen_certification(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<ReviewCertification>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        ops.reopen_certification(session.identity(), body),
    )
}

pub async fn list_period_certifications(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(course_id): Path<String>,
    Query(query): Query<dto::PeriodScopeQuery>,
) -> Response {
    let course_id: CourseId = match errors::parse_id(&course_id, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scope = CertificationScope::Period {
        course_id,
        period: query.period,
        target: query.target,
    };
    errors::respond(StatusCode::OK, ops.list_certifications(session.identity(), scope))
}
