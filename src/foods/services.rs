use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::aggregate::{merge_community, merge_with_external, AggregatedCandidate};
use super::dto::SearchResponse;
use super::repo::{self, GroupedHistoryRow, SharedFoodItem};
use crate::error::AppError;
use crate::state::AppState;

/// How many rows each community source contributes to a merged search.
pub const COMMUNITY_LIMIT: i64 = 10;

/// Community merge result. `degraded` is set when at least one source
/// failed and the list was built from the survivors.
#[derive(Debug)]
pub struct CommunityCandidates {
    pub candidates: Vec<AggregatedCandidate>,
    pub degraded: bool,
}

/// The three community lookups for one query, issued concurrently. Any
/// single failed source is dropped from the merge; only all three failing
/// is an error.
pub async fn community_candidates(
    db: &PgPool,
    user_id: Uuid,
    query: &str,
    limit: i64,
) -> Result<CommunityCandidates, AppError> {
    if query.trim().is_empty() {
        return Err(AppError::validation("search query must not be empty"));
    }
    if limit < 0 {
        return Err(AppError::validation("limit must be non-negative"));
    }

    let (shared, own, others) = tokio::join!(
        repo::shared_by_name(db, query, limit),
        repo::own_history(db, user_id, query, limit),
        repo::others_history(db, user_id, query, limit),
    );
    assemble_community(shared, own, others)
}

fn keep_or_degrade<T>(degraded: &mut bool, source: &str, result: sqlx::Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, source, "community source failed, proceeding without it");
            *degraded = true;
            Vec::new()
        }
    }
}

fn assemble_community(
    shared: sqlx::Result<Vec<SharedFoodItem>>,
    own: sqlx::Result<Vec<GroupedHistoryRow>>,
    others: sqlx::Result<Vec<GroupedHistoryRow>>,
) -> Result<CommunityCandidates, AppError> {
    match (shared, own, others) {
        (Err(e), Err(_), Err(_)) => {
            warn!(error = %e, "all community sources failed");
            Err(e.into())
        }
        (shared, own, others) => {
            let mut degraded = false;
            let shared = keep_or_degrade(&mut degraded, "shared", shared);
            let own = keep_or_degrade(&mut degraded, "own_history", own);
            let others = keep_or_degrade(&mut degraded, "others_history", others);
            Ok(CommunityCandidates {
                candidates: merge_community(shared, own, others),
                degraded,
            })
        }
    }
}

/// Full search: community candidates plus one cached external catalog
/// page. The two sides are independent I/O and run concurrently. A single
/// failed side degrades the response with a warning instead of failing
/// the request; only a total failure propagates.
pub async fn search_food(
    state: &AppState,
    user_id: Uuid,
    query: &str,
    page: u32,
) -> Result<SearchResponse, AppError> {
    if query.trim().is_empty() {
        return Err(AppError::validation("search query must not be empty"));
    }
    if page == 0 {
        return Err(AppError::validation("page must be >= 1"));
    }

    let external_fut = state
        .search_cache
        .get_or_fetch(query, page, || state.provider.search(query, page));
    let community_fut = community_candidates(&state.db, user_id, query, COMMUNITY_LIMIT);

    let (external, community) = tokio::join!(external_fut, community_fut);

    match (community, external) {
        (Ok(community), Ok(external)) => Ok(SearchResponse {
            records: merge_with_external(community.candidates, external.records),
            page: external.page,
            total_pages: external.total_pages,
            total_count: external.total_count,
            warning: community
                .degraded
                .then(|| "some community food data is unavailable right now".into()),
        }),
        (Ok(community), Err(e)) => {
            warn!(error = %e, query, "external source failed, serving community results only");
            let total_count = community.candidates.len() as u64;
            Ok(SearchResponse {
                records: community.candidates,
                page,
                total_pages: u32::from(total_count > 0),
                total_count,
                warning: Some("external food database is unavailable right now".into()),
            })
        }
        (Err(e), Ok(external)) => {
            warn!(error = %e, query, "community lookups failed, serving external results only");
            Ok(SearchResponse {
                records: merge_with_external(Vec::new(), external.records),
                page: external.page,
                total_pages: external.total_pages,
                total_count: external.total_count,
                warning: Some("community food data is unavailable right now".into()),
            })
        }
        (Err(community_err), Err(external_err)) => {
            warn!(community = %community_err, external = %external_err, query, "all search sources failed");
            Err(community_err)
        }
    }
}
