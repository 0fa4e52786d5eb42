use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode};

use astral_infra::Operations;

use crate::app::errors;
use crate::context::Session;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller's resolved tenancy: user, institution, membership and effective role.
pub async fn whoami(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    errors::respond(StatusCode::OK, ops.whoami(session.identity()))
}
