use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes open to every active user. Resource-level rules still apply inside the
/// handlers: documents are filtered by visibility and messages by participant.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Own account ---
        .route(
            "/api/users/profile",
            get(handlers::users::get_profile).patch(handlers::users::update_profile),
        )
        .route(
            "/api/users/change-password",
            post(handlers::users::change_password),
        )
        // --- Academic structure (read-only here; writes live in the admin group) ---
        .route("/api/classes", get(handlers::classes::list_classes))
        .route("/api/classes/{id}", get(handlers::classes::get_class))
        .route("/api/courses", get(handlers::courses::list_courses))
        .route("/api/courses/{id}", get(handlers::courses::get_course))
        .route("/api/schedules", get(handlers::schedules::list_schedules))
        .route("/api/schedules/{id}", get(handlers::schedules::get_schedule))
        // --- Documents ---
        // POST is a multipart upload; the body limit is raised for it in create_router.
        .route(
            "/api/documents",
            get(handlers::documents::list_documents).post(handlers::documents::upload_document),
        )
        .route(
            "/api/documents/{id}",
            get(handlers::documents::get_document)
                .patch(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        .route(
            "/api/documents/{id}/download",
            get(handlers::documents::download_document),
        )
        // --- Messages ---
        .route("/api/messages", post(handlers::messages::send_message))
        .route("/api/messages/inbox", get(handlers::messages::list_inbox))
        .route("/api/messages/sent", get(handlers::messages::list_sent))
        .route(
            "/api/messages/{id}",
            get(handlers::messages::get_message).delete(handlers::messages::delete_message),
        )
        .route(
            "/api/messages/{id}/replies",
            get(handlers::messages::list_replies),
        )
}
