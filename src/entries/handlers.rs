use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateEntryRequest, DailyRollup, ListParams, RollupParams, UpdateEntryRequest};
use super::repo::NutritionEntry;
use super::services;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition-data", post(create_entry).get(list_entries))
        .route("/nutrition-data/daily", get(daily_rollup))
        .route(
            "/nutrition-data/:id",
            put(update_entry).delete(delete_entry),
        )
}

#[instrument(skip(state, body))]
async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<NutritionEntry>), AppError> {
    let entry = services::create_entry(&state.db, user_id, body).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state))]
async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<NutritionEntry>>, AppError> {
    let entries = services::list_recent(&state.db, user_id, params).await?;
    Ok(Json(entries))
}

#[instrument(skip(state, body))]
async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEntryRequest>,
) -> Result<Json<NutritionEntry>, AppError> {
    let entry = services::update_entry(&state.db, id, user_id, body).await?;
    Ok(Json(entry))
}

#[instrument(skip(state))]
async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_entry(&state.db, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn daily_rollup(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<RollupParams>,
) -> Result<Json<DailyRollup>, AppError> {
    let rollup = services::rollup(&state.db, user_id, params).await?;
    Ok(Json(rollup))
}
