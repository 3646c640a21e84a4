use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Staff Router Module
///
/// Read access to student and teacher records and class rosters, for admins and
/// teachers. Wrapped in the `require_staff` gate by `create_router`.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(handlers::students::list_students))
        .route("/api/students/{id}", get(handlers::students::get_student))
        .route("/api/teachers", get(handlers::teachers::list_teachers))
        .route("/api/teachers/{id}", get(handlers::teachers::get_teacher))
        .route(
            "/api/classes/{id}/students",
            get(handlers::classes::list_class_students),
        )
}
