use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use astral_core::{CourseId, RecordId};
use astral_infra::{
    CertifyRecord, CourseRecordsFilter, CreateRecord, Operations, SignRecord, UpdateRecord,
};
use astral_libro::{CertificationScope, SignatureRequest};

use crate::app::{dto, errors};
use crate::context::Session;

pub fn router() -> Router {
    Router::new()
        .route("/records", post(create_record))
        .route("/records/:id", get(get_record).put(update_record))
        .route("/records/:id/signatures", post(sign_record).get(list_signatures))
        .route("/records/:id/certification-requests", post(request_certification))
        .route(
            "/records/:id/certifications",
            post(certify_record).get(list_record_certifications),
        )
        .route("/courses/:course_id/records", get(list_course_records))
}

pub async fn create_record(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateRecord>,
) -> Response {
    errors::respond(StatusCode::CREATED, ops.create_record(session.identity(), body))
}

pub async fn get_record(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, ops.get_record(session.identity(), record_id))
}

pub async fn update_record(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateRecordRequest>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let args = UpdateRecord {
        record_id,
        body: body.body,
    };
    errors::respond(StatusCode::OK, ops.update_record(session.identity(), args))
}

pub async fn list_course_records(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(course_id): Path<String>,
    Query(filter): Query<CourseRecordsFilter>,
) -> Response {
    let course_id: CourseId = match errors::parse_id(&course_id, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        ops.list_course_records(session.identity(), course_id, filter),
    )
}

pub async fn sign_record(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(request): Json<SignatureRequest>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let args = SignRecord { record_id, request };
    errors::respond(StatusCode::CREATED, ops.sign_record(session.identity(), args))
}

pub async fn list_signatures(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, ops.list_signatures(session.identity(), record_id))
}

pub async fn request_certification(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::CertifyRecordRequest>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let args = CertifyRecord {
        record_id,
        certification_type: body.certification_type,
        notes: body.notes,
    };
    errors::respond(
        StatusCode::CREATED,
        ops.request_certification(session.identity(), args),
    )
}

pub async fn certify_record(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::CertifyRecordRequest>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let args = CertifyRecord {
        record_id,
        certification_type: body.certification_type,
        notes: body.notes,
    };
    errors::respond(StatusCode::CREATED, ops.certify_record(session.identity(), args))
}

/// Certification history of a single record. The record type is taken from
/// the stored record, so callers only need the id.
pub async fn list_record_certifications(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let record_id: RecordId = match errors::parse_id(&id, "record") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let result = ops.get_record(session.identity(), record_id).and_then(|view| {
        let scope = CertificationScope::Record {
            record_type: view.record.record_type,
            record_id,
        };
        ops.list_certifications(session.identity(), scope)
    });
    errors::respond(StatusCode::OK, result)
}
