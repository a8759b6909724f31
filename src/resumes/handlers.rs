use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    resumes::dto::{ResumeDraft, StoredResume},
    state::AppState,
};

pub fn resume_routes() -> Router<AppState> {
    Router::new().route("/resumes", get(list_resumes).post(save_resume))
}

/// The caller's drafts: an empty list or exactly one element.
#[instrument(skip(state))]
pub async fn list_resumes(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<StoredResume>>, AppError> {
    let found = state.resumes.find_by_user(identity.user_id).await?;
    Ok(Json(found.into_iter().collect()))
}

/// Creates or replaces the caller's draft. Ownership comes from the token,
/// never from the body.
#[instrument(skip(state, payload))]
pub async fn save_resume(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<ResumeDraft>, JsonRejection>,
) -> Result<Json<StoredResume>, AppError> {
    let Json(draft) = payload?;
    let saved = state.resumes.upsert(identity.user_id, draft).await?;
    info!(user_id = %identity.user_id, "resume saved");
    Ok(Json(saved))
}
