use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::aggregate::AggregatedCandidate;
use super::dto::{CommunityParams, SearchParams, SearchResponse};
use super::services;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/foods/search", get(search))
        .route("/foods/community", get(community))
}

#[instrument(skip(state))]
async fn search(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let result = services::search_food(&state, user_id, &params.query, params.page).await?;
    Ok(Json(result))
}

#[instrument(skip(state))]
async fn community(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<CommunityParams>,
) -> Result<Json<Vec<AggregatedCandidate>>, AppError> {
    let result =
        services::community_candidates(&state.db, user_id, &params.query, params.limit).await?;
    Ok(Json(result.candidates))
}
