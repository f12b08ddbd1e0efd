use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::middleware::AuthUser;
use crate::models::{AddMemberRequest, UpdateTradebookRequest};
use crate::services;
use crate::state::AppState;

/// POST /tradebook
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let id =
        services::tradebook::create_tradebook(&state.pool, &state.keys, &user.subject).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// GET /tradebook/:tradebook_id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tradebook =
        services::tradebook::get_tradebook(&state.pool, &user.subject, tradebook_id).await?;
    Ok(Json(tradebook))
}

/// GET /tradebooks
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = pagination.window();
    let tradebooks =
        services::tradebook::list_tradebooks(&state.pool, &user.subject, limit, offset).await?;
    Ok(Json(tradebooks))
}

/// PATCH /tradebook/:tradebook_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
    Json(request): Json<UpdateTradebookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    let tradebook = services::tradebook::update_tradebook(
        &state.pool,
        &user.subject,
        tradebook_id,
        &request.title,
    )
    .await?;
    Ok(Json(tradebook))
}

/// DELETE /tradebook/:tradebook_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    services::tradebook::delete_tradebook(&state.pool, &user.subject, tradebook_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /tradebooks
pub async fn delete_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    services::tradebook::delete_all_tradebooks(&state.pool, &user.subject).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /tradebook/:tradebook_id/member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.user_id.is_empty() {
        return Err(ApiError::bad_request("Member user id cannot be empty"));
    }
    services::tradebook::add_member(
        &state.pool,
        &user.subject,
        tradebook_id,
        &request.user_id,
        request.role,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
