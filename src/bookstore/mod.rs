//! HTTP server: routes, the authorization guard and start-up wiring.

use anyhow::{Context, Result};
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;

use crate::{
    auth::{Authenticator, AuthorizationPolicy, BcryptHasher, PgCredentialStore},
    catalog::PgBookStore,
};

mod guard;
pub mod handlers;
mod openapi;
mod state;

pub use openapi::openapi;
pub use state::{AppState, MAX_SESSION_TTL_SECONDS, ServerConfig};

use handlers::{books, health, login, root};

/// Build the application router.
///
/// Every route except `/health` and `/openapi.json` passes through the
/// authorization guard, including the 404 fallback.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", axum::routing::post(login::logout))
        .route("/me", get(login::me))
        .route("/books", get(books::list_books))
        .route("/books/add", get(books::add_form).post(books::add_book))
        .route(
            "/books/edit/:id",
            get(books::edit_form).post(books::update_book),
        )
        .route("/books/delete/:id", get(books::delete_book))
        .layer(middleware::from_fn(guard::authorize_request))
        .route("/health", get(health::health).options(health::health))
        .route("/openapi.json", get(|| async { Json(openapi()) }))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Connect to Postgres and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if the database is unreachable, the listener cannot bind,
/// or the server fails.
pub async fn new(
    port: u16,
    dsn: &str,
    policy: AuthorizationPolicy,
    config: ServerConfig,
) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let authenticator = Authenticator::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(BcryptHasher::new(config.bcrypt_cost())),
    )
    .context("Failed to initialise authenticator")?;

    let state = Arc::new(AppState::new(
        authenticator,
        policy,
        Arc::new(PgBookStore::new(pool)),
        config,
    ));

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
