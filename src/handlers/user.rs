use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::ApiError;
use crate::models::UpsertUserRequest;
use crate::services;
use crate::state::AppState;

/// POST /user and PATCH /user (identity-provider webhook).
pub async fn upsert(
    State(state): State<AppState>,
    Json(request): Json<UpsertUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.id.trim().is_empty() {
        return Err(ApiError::bad_request("User id cannot be empty"));
    }
    services::user::upsert_user(&state.pool, &request.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /user/:user_id (identity-provider webhook).
pub async fn delete(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    services::user::delete_user(&state.pool, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
