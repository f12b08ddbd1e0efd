use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{NewTradeRequest, UpdateTradeRequest};
use crate::services;
use crate::state::AppState;

/// Accepts either a single trade object or an array of trades.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum TradePayload {
    One(NewTradeRequest),
    Many(Vec<NewTradeRequest>),
}

/// POST /trade/:tradebook_id
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
    Json(payload): Json<TradePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let trades = match payload {
        TradePayload::One(trade) => vec![trade],
        TradePayload::Many(trades) => trades,
    };
    if trades.is_empty() {
        return Err(ApiError::bad_request("No trades supplied"));
    }

    let ids = services::trade::create_trades(
        &state.pool,
        &state.keys,
        &user.subject,
        tradebook_id,
        trades,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "ids": ids }))))
}

/// GET /trade/:tradebook_id
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let trades =
        services::trade::list_trades(&state.pool, &state.keys, &user.subject, tradebook_id)
            .await?;
    Ok(Json(trades))
}

/// PATCH /trade/:tradebook_id/:trade_id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((tradebook_id, trade_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateTradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trade = services::trade::update_trade(
        &state.pool,
        &state.keys,
        &user.subject,
        tradebook_id,
        trade_id,
        request,
    )
    .await?;
    Ok(Json(trade))
}

/// DELETE /trade/:tradebook_id
pub async fn delete_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tradebook_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted =
        services::trade::delete_trades(&state.pool, &user.subject, tradebook_id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}
