use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use astral_core::{CourseId, LockId};
use astral_infra::{LockScope, LocksFilter, Operations};

use crate::app::errors;
use crate::context::Session;

pub fn router() -> Router {
    Router::new()
        .route("/locks", post(lock_scope))
        .route("/locks/:id/unlock", post(unlock))
        .route("/courses/:course_id/locks", get(list_locks))
}

pub async fn lock_scope(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<LockScope>,
) -> Response {
    errors::respond(StatusCode::CREATED, ops.lock_scope(session.identity(), body))
}

pub async fn unlock(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let lock_id: LockId = match errors::parse_id(&id, "lock") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, ops.unlock(session.identity(), lock_id))
}

pub async fn list_locks(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(course_id): Path<String>,
    Query(filter): Query<LocksFilter>,
) -> Response {
    let course_id: CourseId = match errors::parse_id(&course_id, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, ops.list_locks(session.identity(), course_id, filter))
}
