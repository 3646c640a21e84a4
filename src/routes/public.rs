use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: the service banner, the health probe used by
/// load balancers, and login.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        .route("/", get(handlers::welcome))
        // GET /health
        // Returns "ok" immediately; used for liveness checks.
        .route("/health", get(handlers::health))
        // POST /api/users/login
        // Exchanges email + password for a signed access token.
        .route("/api/users/login", post(handlers::users::login))
}
