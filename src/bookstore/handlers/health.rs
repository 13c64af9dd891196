use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::{GIT_COMMIT_HASH, bookstore::AppState};

const HEALTH_STORE_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses (
        (status = 200, description = "Book store is reachable", body = Health),
        (status = 503, description = "Book store is unreachable", body = Health)
    ),
    tag = "health",
)]
/// Report build metadata and whether the book store answers a ping.
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let store_healthy = check_store(&state).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if store_healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            debug!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    if store_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

async fn check_store(state: &AppState) -> bool {
    match timeout(
        Duration::from_secs(HEALTH_STORE_TIMEOUT_SECONDS),
        state.books().ping(),
    )
    .await
    {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!("Book store ping failed: {err:?}");
            false
        }
        Err(_) => {
            warn!("Book store health check timed out");
            false
        }
    }
}
