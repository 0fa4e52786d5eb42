use axum::{Router, routing::get};

pub mod certifications;
pub mod locks;
pub mod memberships;
pub mod records;
pub mod system;

/// Router for all session-aware endpoints. Tenancy is resolved per operation.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(records::router())
        .merge(certifications::router())
        .merge(locks::router())
        .merge(memberships::router())
}
