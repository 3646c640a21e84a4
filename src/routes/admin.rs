use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Admin Router Module
///
/// Account management, profile edits and every write to the academic structure.
/// Wrapped in the `require_admin` gate by `create_router`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats
        // Entity counts for the dashboard.
        .route("/api/admin/stats", get(handlers::admin::get_admin_stats))
        // --- Users ---
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        // DELETE deactivates the account; the row is kept.
        .route(
            "/api/users/{id}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // --- Profiles ---
        .route(
            "/api/students/{id}",
            patch(handlers::students::update_student),
        )
        .route(
            "/api/teachers/{id}",
            patch(handlers::teachers::update_teacher),
        )
        // --- Classes & enrollment ---
        .route("/api/classes", post(handlers::classes::create_class))
        .route(
            "/api/classes/{id}",
            patch(handlers::classes::update_class).delete(handlers::classes::delete_class),
        )
        .route(
            "/api/classes/{id}/students/{student_id}",
            post(handlers::classes::enroll_student).delete(handlers::classes::unenroll_student),
        )
        // --- Courses ---
        .route("/api/courses", post(handlers::courses::create_course))
        .route(
            "/api/courses/{id}",
            patch(handlers::courses::update_course).delete(handlers::courses::delete_course),
        )
        // --- Schedules ---
        .route("/api/schedules", post(handlers::schedules::create_schedule))
        .route(
            "/api/schedules/{id}",
            patch(handlers::schedules::update_schedule)
                .delete(handlers::schedules::delete_schedule),
        )
}
