//! Request guard: resolve the session, then ask the policy.
//!
//! Allowed requests carry the resolved [`Principal`] as a request extension so
//! handlers can read it with `Option<Extension<Principal>>`.

use axum::{
    Extension, Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::state::AppState;
use crate::auth::{Decision, Principal, ResourceDescriptor, extract_session_token};

pub async fn authorize_request(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = match extract_session_token(request.headers()) {
        Some(token) => state.sessions().resolve(&token).await,
        None => None,
    };

    let resource = ResourceDescriptor::new(request.uri().path());
    match state.policy().authorize(principal.as_ref(), &resource) {
        Decision::Allow => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        Decision::Deny => deny(principal.as_ref(), &resource),
    }
}

fn deny(principal: Option<&Principal>, resource: &ResourceDescriptor) -> Response {
    match principal {
        None => {
            debug!(path = resource.path(), "Anonymous request denied");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Authentication required"})),
            )
                .into_response()
        }
        Some(principal) => {
            debug!(
                path = resource.path(),
                identity = principal.identity(),
                role = principal.role().as_str(),
                "Request denied"
            );
            (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "Access denied"})),
            )
                .into_response()
        }
    }
}
