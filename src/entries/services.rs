use std::collections::BTreeMap;

use sqlx::PgPool;
use time::macros::{format_description, time};
use time::{Date, OffsetDateTime, Time};
use tracing::info;
use uuid::Uuid;

use super::dto::{
    CreateEntryRequest, DailyRollup, ListParams, NutrientSums, RollupParams, UpdateEntryRequest,
};
use super::repo::{self, EntryChanges, MealType, NewEntry, NutritionEntry};
use crate::error::AppError;
use crate::foods;
use crate::nutrients;

const DAY_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

fn parse_day(input: &str) -> Result<Date, AppError> {
    Date::parse(input.trim(), DAY_FORMAT)
        .map_err(|_| AppError::validation(format!("invalid date '{input}', expected YYYY-MM-DD")))
}

fn parse_meal_type(input: &str) -> Result<MealType, AppError> {
    MealType::parse(input).ok_or_else(|| {
        AppError::validation(format!(
            "invalid meal type '{input}', expected BREAKFAST, LUNCH or DINNER"
        ))
    })
}

/// Inclusive bounds of the local calendar day; no timezone conversion.
fn day_window(day: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.with_time(Time::MIDNIGHT).assume_utc();
    let end = day.with_time(time!(23:59:59.999)).assume_utc();
    (start, end)
}

fn ensure_non_negative(field: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AppError::validation(format!("{field} must be non-negative")))
    }
}

fn ensure_valid_limit(limit: i64) -> Result<(), AppError> {
    if limit < 0 {
        Err(AppError::validation("limit must be non-negative"))
    } else {
        Ok(())
    }
}

/// Row to insert for a validated create request. `carb_units` is derived
/// here, never taken from the caller.
fn new_entry<'a>(
    user_id: Uuid,
    req: &'a CreateEntryRequest,
    meal_type: MealType,
    day: Date,
    shared_item_id: Option<Uuid>,
) -> NewEntry<'a> {
    NewEntry {
        user_id,
        name: req.name.trim(),
        date: day.with_time(Time::MIDNIGHT).assume_utc(),
        meal_type,
        calories: req.calories,
        carbs: req.carbs,
        proteins: req.proteins,
        fats: req.fats,
        carb_units: nutrients::carb_units(req.carbs),
        shared_item_id,
    }
}

/// Partial update against the current row. `carb_units` is rederived from
/// the new carbs when supplied, otherwise from the stored value.
fn entry_changes<'a>(
    current: &NutritionEntry,
    req: &'a UpdateEntryRequest,
    meal_type: Option<MealType>,
    date: Option<OffsetDateTime>,
) -> EntryChanges<'a> {
    EntryChanges {
        name: req.name.as_deref().map(str::trim),
        date,
        meal_type,
        calories: req.calories,
        carbs: req.carbs,
        proteins: req.proteins,
        fats: req.fats,
        carb_units: nutrients::carb_units(req.carbs.unwrap_or(current.carbs)),
    }
}

pub async fn create_entry(
    db: &PgPool,
    user_id: Uuid,
    req: CreateEntryRequest,
) -> Result<NutritionEntry, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    ensure_non_negative("calories", req.calories)?;
    ensure_non_negative("carbs", req.carbs)?;
    ensure_non_negative("proteins", req.proteins)?;
    ensure_non_negative("fats", req.fats)?;
    let meal_type = parse_meal_type(&req.meal_type)?;
    let day = parse_day(&req.date)?;

    // Manual entries become future community candidates; catalog-sourced
    // entries deliberately do not enter the shared pool.
    let shared_item_id = if req.is_manual_entry {
        let item = foods::repo::insert_shared_item(
            db,
            user_id,
            req.name.trim(),
            req.calories,
            req.carbs,
            req.proteins,
            req.fats,
            nutrients::carb_units(req.carbs),
        )
        .await?;
        info!(shared_item_id = %item.id, name = %item.name, "materialized community candidate");
        Some(item.id)
    } else {
        None
    };

    let entry = repo::insert_entry(db, new_entry(user_id, &req, meal_type, day, shared_item_id))
        .await?;
    Ok(entry)
}

pub async fn update_entry(
    db: &PgPool,
    entry_id: Uuid,
    owner_id: Uuid,
    req: UpdateEntryRequest,
) -> Result<NutritionEntry, AppError> {
    if let Some(name) = req.name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
    }
    for (field, value) in [
        ("calories", req.calories),
        ("carbs", req.carbs),
        ("proteins", req.proteins),
        ("fats", req.fats),
    ] {
        if let Some(v) = value {
            ensure_non_negative(field, v)?;
        }
    }
    let meal_type = req.meal_type.as_deref().map(parse_meal_type).transpose()?;
    let date = req
        .date
        .as_deref()
        .map(parse_day)
        .transpose()?
        .map(|d| d.with_time(Time::MIDNIGHT).assume_utc());

    let entry = repo::find_entry(db, entry_id)
        .await?
        .ok_or_else(|| AppError::not_found("entry not found"))?;
    if entry.user_id != owner_id {
        return Err(AppError::Forbidden("entry belongs to another user".into()));
    }

    let updated =
        repo::update_entry(db, entry_id, entry_changes(&entry, &req, meal_type, date)).await?;
    Ok(updated)
}

pub async fn delete_entry(db: &PgPool, entry_id: Uuid, owner_id: Uuid) -> Result<(), AppError> {
    let entry = repo::find_entry(db, entry_id)
        .await?
        .ok_or_else(|| AppError::not_found("entry not found"))?;
    if entry.user_id != owner_id {
        return Err(AppError::Forbidden("entry belongs to another user".into()));
    }

    let deleted = repo::delete_entry(db, entry_id).await?;
    if deleted == 0 {
        return Err(AppError::not_found("entry not found"));
    }
    Ok(())
}

pub async fn list_recent(
    db: &PgPool,
    user_id: Uuid,
    params: ListParams,
) -> Result<Vec<NutritionEntry>, AppError> {
    ensure_valid_limit(params.limit)?;
    let meal_type = params.meal_type.as_deref().map(parse_meal_type).transpose()?;
    let window = params
        .date
        .as_deref()
        .map(parse_day)
        .transpose()?
        .map(day_window);
    let entries = repo::list_recent(db, user_id, meal_type, window, Some(params.limit)).await?;
    Ok(entries)
}

/// Aggregate one calendar day into per-meal buckets and grand totals.
/// An empty day is a valid, all-zero rollup.
pub async fn rollup(
    db: &PgPool,
    user_id: Uuid,
    params: RollupParams,
) -> Result<DailyRollup, AppError> {
    if let Some(limit) = params.limit {
        ensure_valid_limit(limit)?;
    }
    let day = parse_day(&params.date)?;
    let meal_type = params.meal_type.as_deref().map(parse_meal_type).transpose()?;
    let entries = repo::list_recent(db, user_id, meal_type, Some(day_window(day)), params.limit)
        .await?;
    Ok(build_rollup(params.date.trim().to_string(), entries))
}

fn build_rollup(date: String, entries: Vec<NutritionEntry>) -> DailyRollup {
    let mut total_nutrition = NutrientSums::default();
    let mut meals: BTreeMap<MealType, Vec<NutritionEntry>> = BTreeMap::new();
    for entry in entries {
        total_nutrition.add(&entry);
        meals.entry(entry.meal_type).or_default().push(entry);
    }
    DailyRollup {
        date,
        total_nutrition,
        meals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn entry(meal_type: MealType, carbs: f64) -> NutritionEntry {
        NutritionEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Oatmeal".into(),
            date: OffsetDateTime::now_utc(),
            meal_type,
            calories: 100.0,
            carbs,
            proteins: 4.0,
            fats: 2.0,
            carb_units: carbs / 10.0,
            shared_item_id: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn parse_day_accepts_iso_dates() {
        assert!(parse_day("2024-08-20").is_ok());
        assert!(parse_day("2024-02-30").is_err());
        assert!(parse_day("20.08.2024").is_err());
        assert!(parse_day("").is_err());
    }

    #[test]
    fn day_window_spans_whole_day_inclusive() {
        let day = parse_day("2024-08-20").unwrap();
        let (start, end) = day_window(day);
        assert_eq!(start.time(), Time::MIDNIGHT);
        assert_eq!(end.time(), time!(23:59:59.999));
        assert_eq!(start.date(), end.date());
    }

    #[test]
    fn empty_day_rolls_up_to_zero() {
        let rollup = build_rollup("2024-08-20".into(), vec![]);
        assert_eq!(rollup.total_nutrition, NutrientSums::default());
        assert!(rollup.meals.is_empty());
    }

    #[test]
    fn rollup_sums_and_groups_by_meal() {
        let rollup = build_rollup(
            "2024-08-20".into(),
            vec![
                entry(MealType::Breakfast, 10.0),
                entry(MealType::Breakfast, 20.0),
                entry(MealType::Dinner, 5.0),
            ],
        );
        assert_eq!(rollup.total_nutrition.carbs, 35.0);
        assert_eq!(rollup.total_nutrition.calories, 300.0);
        assert_eq!(rollup.meals[&MealType::Breakfast].len(), 2);
        assert_eq!(rollup.meals[&MealType::Dinner].len(), 1);
        assert!(!rollup.meals.contains_key(&MealType::Lunch));
    }

    #[test]
    fn rollup_meals_serialize_keyed_by_canonical_meal_type() {
        let rollup = build_rollup("2024-08-20".into(), vec![entry(MealType::Breakfast, 10.0)]);
        let value = serde_json::to_value(&rollup).unwrap();
        assert!(value["meals"]["BREAKFAST"].is_array());
        assert_eq!(value["total_nutrition"]["carbs"], 10.0);
    }

    fn soup_request() -> CreateEntryRequest {
        CreateEntryRequest {
            name: "Homemade Soup".into(),
            calories: 120.0,
            carbs: 15.0,
            proteins: 5.0,
            fats: 3.0,
            meal_type: "lunch".into(),
            date: "2024-08-20".into(),
            is_manual_entry: true,
        }
    }

    #[test]
    fn new_entry_derives_carb_units_server_side() {
        let req = soup_request();
        let user_id = Uuid::new_v4();
        let shared_id = Uuid::new_v4();
        let day = parse_day(&req.date).unwrap();
        let new = new_entry(user_id, &req, MealType::Lunch, day, Some(shared_id));
        assert_eq!(new.carb_units, 1.5);
        assert_eq!(new.carbs, 15.0);
        assert_eq!(new.shared_item_id, Some(shared_id));
        assert_eq!(new.date.time(), Time::MIDNIGHT);
        assert_eq!(new.name, "Homemade Soup");
    }

    #[test]
    fn update_recomputes_carb_units_from_new_carbs() {
        let current = entry(MealType::Lunch, 15.0);
        let req = UpdateEntryRequest {
            carbs: Some(30.0),
            ..Default::default()
        };
        let changes = entry_changes(&current, &req, None, None);
        assert_eq!(changes.carb_units, 3.0);
        // Everything not supplied stays unchanged.
        assert_eq!(changes.carbs, Some(30.0));
        assert_eq!(changes.calories, None);
        assert_eq!(changes.proteins, None);
        assert_eq!(changes.fats, None);
        assert_eq!(changes.name, None);
        assert!(changes.date.is_none());
        assert!(changes.meal_type.is_none());
    }

    #[test]
    fn update_keeps_carb_units_when_carbs_absent() {
        let current = entry(MealType::Dinner, 15.0);
        let req = UpdateEntryRequest {
            name: Some("Leftover Soup".into()),
            ..Default::default()
        };
        let changes = entry_changes(&current, &req, None, None);
        assert_eq!(changes.carb_units, 1.5);
        assert_eq!(changes.carbs, None);
    }

    #[tokio::test]
    async fn list_rejects_negative_limit_before_io() {
        let state = AppState::fake();
        let err = list_recent(
            &state.db,
            Uuid::new_v4(),
            ListParams {
                meal_type: None,
                date: None,
                limit: -5,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn rollup_rejects_negative_limit_before_io() {
        let state = AppState::fake();
        let err = rollup(
            &state.db,
            Uuid::new_v4(),
            RollupParams {
                date: "2024-08-20".into(),
                meal_type: None,
                limit: Some(-1),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_bad_meal_type_before_io() {
        let state = AppState::fake();
        let err = create_entry(
            &state.db,
            Uuid::new_v4(),
            CreateEntryRequest {
                name: "Homemade Soup".into(),
                calories: 120.0,
                carbs: 15.0,
                proteins: 5.0,
                fats: 3.0,
                meal_type: "brunch".into(),
                date: "2024-08-20".into(),
                is_manual_entry: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_invalid_date_before_io() {
        let state = AppState::fake();
        let err = create_entry(
            &state.db,
            Uuid::new_v4(),
            CreateEntryRequest {
                name: "Homemade Soup".into(),
                calories: 120.0,
                carbs: 15.0,
                proteins: 5.0,
                fats: 3.0,
                meal_type: "lunch".into(),
                date: "not-a-date".into(),
                is_manual_entry: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_negative_macros_before_io() {
        let state = AppState::fake();
        let err = create_entry(
            &state.db,
            Uuid::new_v4(),
            CreateEntryRequest {
                name: "Homemade Soup".into(),
                calories: -1.0,
                carbs: 15.0,
                proteins: 5.0,
                fats: 3.0,
                meal_type: "lunch".into(),
                date: "2024-08-20".into(),
                is_manual_entry: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_rejects_bad_partial_fields_before_io() {
        let state = AppState::fake();
        let err = update_entry(
            &state.db,
            Uuid::new_v4(),
            Uuid::new_v4(),
            UpdateEntryRequest {
                meal_type: Some("snack".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
