use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use astral_auth::IdentityProvider;

use crate::app::errors::json_error;
use crate::context::Session;

#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<dyn IdentityProvider>,
}

/// Attach a [`Session`] to every request.
///
/// A missing `Authorization` header yields an anonymous session; a header that
/// is present but does not verify is rejected here with 401.
pub async fn identity_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let session = match extract_bearer(req.headers()) {
        Ok(None) => Session::anonymous(),
        Ok(Some(token)) => match state.provider.authenticate(token, Utc::now()) {
            Ok(identity) => Session::authenticated(identity),
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                return json_error(StatusCode::UNAUTHORIZED, "invalid_token", e.to_string());
            }
        },
        Err(message) => return json_error(StatusCode::UNAUTHORIZED, "invalid_token", message),
    };

    req.extensions_mut().insert(session);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| "authorization header is not ascii")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("authorization header must use the Bearer scheme")?
        .trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }

    Ok(Some(token))
}
