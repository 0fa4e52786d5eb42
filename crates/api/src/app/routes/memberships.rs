use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};

use astral_core::{InstitutionId, MembershipId, UserId};
use astral_infra::{InviteMember, Operations, RegisterInstitution, RegisterUser, SetUserActive};

use crate::app::{dto, errors};
use crate::context::Session;

pub fn router() -> Router {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/:id/active", put(set_user_active))
        .route("/institutions", post(register_institution))
        .route("/institutions/:id/accept", post(accept_invitation))
        .route("/memberships", get(list_members))
        .route("/memberships/invitations", post(invite_member))
        .route("/memberships/leave", post(leave_institution))
        .route("/memberships/:id/suspend", post(suspend_member))
        .route("/memberships/:id/reactivate", post(reactivate_member))
        .route("/session/institution", post(switch_institution))
}

pub async fn register_user(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<RegisterUser>,
) -> Response {
    errors::respond(StatusCode::CREATED, ops.register_user(session.identity(), body))
}

pub async fn register_institution(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<RegisterInstitution>,
) -> Response {
    errors::respond(
        StatusCode::CREATED,
        ops.register_institution(session.identity(), body),
    )
}

pub async fn invite_member(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<InviteMember>,
) -> Response {
    errors::respond(StatusCode::CREATED, ops.invite_member(session.identity(), body))
}

pub async fn accept_invitation(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let institution_id: InstitutionId = match errors::parse_id(&id, "institution") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        ops.accept_invitation(session.identity(), institution_id),
    )
}

pub async fn suspend_member(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let membership_id: MembershipId = match errors::parse_id(&id, "membership") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(StatusCode::OK, ops.suspend_member(session.identity(), membership_id))
}

pub async fn reactivate_member(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Response {
    let membership_id: MembershipId = match errors::parse_id(&id, "membership") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    errors::respond(
        StatusCode::OK,
        ops.reactivate_member(session.identity(), membership_id),
    )
}

pub async fn leave_institution(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
) -> Response {
    errors::respond(StatusCode::OK, ops.leave_institution(session.identity()))
}

pub async fn switch_institution(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::SwitchInstitutionRequest>,
) -> Response {
    errors::respond(
        StatusCode::OK,
        ops.switch_institution(session.identity(), body.institution_id),
    )
}

pub async fn set_user_active(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetActiveRequest>,
) -> Response {
    let user_id: UserId = match errors::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let args = SetUserActive {
        user_id,
        is_active: body.is_active,
    };
    errors::respond(StatusCode::OK, ops.set_user_active(session.identity(), args))
}

pub async fn list_members(
    Extension(ops): Extension<Arc<Operations>>,
    Extension(session): Extension<Session>,
) -> Response {
    errors::respond(StatusCode::OK, ops.list_members(session.identity()))
}
