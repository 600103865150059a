//! Contains all the routes that this application can handle.

mod newsletter;

use crate::app::AppState;
use newsletter::{preflight, submit};

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// All the routes of the server.
/// The submission endpoint answers on any path, the website posts to the bare deployment url.
/// `/health-check` only adds `GET` on top of it.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/health-check",
            get(health_check).post(submit).options(preflight),
        )
        .route("/", post(submit).options(preflight))
        .route("/{*path}", post(submit).options(preflight))
        .with_state(app_state)
}
