//! HTTP API application wiring (Axum router + operation wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per concern)
//! - `dto.rs`: request DTOs for routes that split input between path and body
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use astral_auth::IdentityProvider;
use astral_core::SystemClock;
use astral_infra::{Database, Operations};

use crate::config::ApiConfig;
use crate::identity::Hs256IdentityProvider;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &ApiConfig) -> Router {
    let operations = Operations::new(Arc::new(Database::new()), Arc::new(SystemClock), config.settings);
    let provider = Arc::new(Hs256IdentityProvider::new(config.jwt_secret.as_bytes()));
    build_app_with(operations, provider)
}

/// Router over explicit operations and identity provider (tests, embedding).
pub fn build_app_with(operations: Operations, provider: Arc<dyn IdentityProvider>) -> Router {
    let auth_state = middleware::AuthState { provider };

    let api = routes::router()
        .layer(Extension(Arc::new(operations)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::identity_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(ServiceBuilder::new())
}
