use serde::Serialize;

use super::repo::{GroupedHistoryRow, SharedFoodItem};
use crate::nutrients;
use crate::provider::ExternalFoodRecord;

/// Two candidates with the same name count as duplicates when every
/// nutrient value differs by less than this. Sources round differently,
/// so exact equality would miss real duplicates.
pub const NUTRIENT_TOLERANCE: f64 = 0.01;

/// Which grouped-history pool a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Own,
    Others,
}

/// Community-side candidate, derived either from a shared item row or
/// from a grouped history row.
#[derive(Debug, Clone, Serialize)]
pub struct CommunityCandidate {
    pub id: String,
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carb_units: f64,
    pub grams: f64,
    pub is_verified: bool,
    pub is_user_data: bool,
    pub is_other_user_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<i64>,
}

impl CommunityCandidate {
    pub fn from_shared(item: SharedFoodItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name,
            calories: item.calories,
            carbs: item.carbs,
            proteins: item.proteins,
            fats: item.fats,
            carb_units: item.carb_units,
            grams: item.grams,
            is_verified: item.is_verified,
            is_user_data: false,
            is_other_user_data: false,
            frequency: None,
        }
    }

    pub fn from_history(row: GroupedHistoryRow, source: HistorySource) -> Self {
        Self {
            id: history_id(&row.name),
            name: row.name,
            calories: row.calories,
            carbs: row.carbs,
            proteins: row.proteins,
            fats: row.fats,
            carb_units: nutrients::carb_units(row.carbs),
            grams: 100.0,
            is_verified: false,
            is_user_data: source == HistorySource::Own,
            is_other_user_data: source == HistorySource::Others,
            frequency: Some(row.frequency),
        }
    }
}

/// Stable synthetic id for a grouped history row: same name, same id on
/// every request. Not cryptographically significant.
pub fn history_id(name: &str) -> String {
    hex::encode(name.as_bytes())
}

/// Merged candidate handed to callers: the provenance is an explicit tag,
/// never inferred from record shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AggregatedCandidate {
    External(ExternalFoodRecord),
    Community(CommunityCandidate),
}

impl AggregatedCandidate {
    pub fn name(&self) -> &str {
        match self {
            Self::External(r) => &r.name,
            Self::Community(c) => &c.name,
        }
    }

    fn nutrient_values(&self) -> [f64; 4] {
        match self {
            Self::External(r) => [
                r.nutrients.calories_per_100g,
                r.nutrients.carbs_per_100g,
                r.nutrients.proteins_per_100g,
                r.nutrients.fats_per_100g,
            ],
            Self::Community(c) => [c.calories, c.carbs, c.proteins, c.fats],
        }
    }

    fn is_duplicate_of(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self
                .nutrient_values()
                .iter()
                .zip(other.nutrient_values())
                .all(|(a, b)| (a - b).abs() < NUTRIENT_TOLERANCE)
    }
}

fn push_unique(out: &mut Vec<AggregatedCandidate>, candidate: AggregatedCandidate) {
    if !out.iter().any(|kept| kept.is_duplicate_of(&candidate)) {
        out.push(candidate);
    }
}

/// Merge the three community sources in priority order: shared items,
/// then the caller's own history, then everyone else's. First occurrence
/// wins, so a verified shared entry is never displaced by a duplicate.
pub fn merge_community(
    shared: Vec<SharedFoodItem>,
    own: Vec<GroupedHistoryRow>,
    others: Vec<GroupedHistoryRow>,
) -> Vec<AggregatedCandidate> {
    let mut out = Vec::with_capacity(shared.len() + own.len() + others.len());
    for item in shared {
        push_unique(
            &mut out,
            AggregatedCandidate::Community(CommunityCandidate::from_shared(item)),
        );
    }
    for row in own {
        push_unique(
            &mut out,
            AggregatedCandidate::Community(CommunityCandidate::from_history(
                row,
                HistorySource::Own,
            )),
        );
    }
    for row in others {
        push_unique(
            &mut out,
            AggregatedCandidate::Community(CommunityCandidate::from_history(
                row,
                HistorySource::Others,
            )),
        );
    }
    out
}

/// Append external records behind the community candidates, deduplicating
/// against everything already kept. Order is otherwise preserved.
pub fn merge_with_external(
    community: Vec<AggregatedCandidate>,
    external: Vec<ExternalFoodRecord>,
) -> Vec<AggregatedCandidate> {
    let mut out = community;
    for record in external {
        push_unique(&mut out, AggregatedCandidate::External(record));
    }
    out
}
