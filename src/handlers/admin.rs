use axum::{Json, extract::State};

use crate::{AppState, error::ApiError, models::AdminDashboardStats};

/// get_admin_stats
///
/// [Admin Route] Entity counts for the dashboard. The role check is done by the
/// route group's gate.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_admin_stats(
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    Ok(Json(state.repo.get_stats().await?))
}
