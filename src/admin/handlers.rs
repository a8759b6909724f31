use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{DeleteResponse, UpdateRoleRequest, UsersResponse},
        extractors::AuthUser,
        repo_types::UserSummary,
        services::parse_role,
    },
    error::AppError,
    state::AppState,
};

/// Admin routes; mounted behind the auth middleware and the role guard.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/role", put(update_role))
        .route("/admin/users/:id", delete(delete_user))
}

/// An id that cannot name a user is reported like an unknown one.
fn user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("User".into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
) -> Result<Response, AppError> {
    let users = state.users.list_all().await?;
    info!(admin_id = %admin.user_id, count = users.len(), "listed users");

    let mut res = Json(UsersResponse { users }).into_response();
    res.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    Ok(res)
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<UserSummary>, AppError> {
    let id = user_id(&id)?;
    let Json(payload) = payload?;
    let role = parse_role(&payload.role).map_err(|msg| AppError::Validation(vec![msg]))?;

    let updated = state.users.update_role(id, role).await?;
    info!(admin_id = %admin.user_id, user_id = %id, role = %role, "role updated");
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = user_id(&id)?;
    state.users.delete(id).await?;
    info!(admin_id = %admin.user_id, user_id = %id, "user deleted");
    Ok(Json(DeleteResponse { success: true }))
}
