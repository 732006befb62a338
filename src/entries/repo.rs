use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "meal_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    /// Canonicalizes case-insensitive caller input.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "BREAKFAST" => Some(Self::Breakfast),
            "LUNCH" => Some(Self::Lunch),
            "DINNER" => Some(Self::Dinner),
            _ => None,
        }
    }

}

/// One logged intake row, exclusively owned by the logging user.
/// `carb_units` is always `carbs / 10`, maintained by the write paths.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NutritionEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub date: OffsetDateTime,
    pub meal_type: MealType,
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carb_units: f64,
    pub shared_item_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewEntry<'a> {
    pub user_id: Uuid,
    pub name: &'a str,
    pub date: OffsetDateTime,
    pub meal_type: MealType,
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carb_units: f64,
    pub shared_item_id: Option<Uuid>,
}

/// Validated partial update. `None` leaves the stored value untouched;
/// `carb_units` is always written, rederived by the service from whichever
/// carbs value ends up effective.
#[derive(Debug)]
pub struct EntryChanges<'a> {
    pub name: Option<&'a str>,
    pub date: Option<OffsetDateTime>,
    pub meal_type: Option<MealType>,
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub proteins: Option<f64>,
    pub fats: Option<f64>,
    pub carb_units: f64,
}

const ENTRY_COLUMNS: &str = "id, user_id, name, date, meal_type, calories, carbs, proteins, fats, \
                             carb_units, shared_item_id, created_at";

pub async fn insert_entry(db: &PgPool, new: NewEntry<'_>) -> sqlx::Result<NutritionEntry> {
    sqlx::query_as::<_, NutritionEntry>(&format!(
        r#"
        INSERT INTO nutrition_entries
            (user_id, name, date, meal_type, calories, carbs, proteins, fats, carb_units, shared_item_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.name)
    .bind(new.date)
    .bind(new.meal_type)
    .bind(new.calories)
    .bind(new.carbs)
    .bind(new.proteins)
    .bind(new.fats)
    .bind(new.carb_units)
    .bind(new.shared_item_id)
    .fetch_one(db)
    .await
}

pub async fn find_entry(db: &PgPool, id: Uuid) -> sqlx::Result<Option<NutritionEntry>> {
    sqlx::query_as::<_, NutritionEntry>(&format!(
        r#"SELECT {ENTRY_COLUMNS} FROM nutrition_entries WHERE id = $1"#
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Applies the supplied fields in one statement.
pub async fn update_entry(
    db: &PgPool,
    id: Uuid,
    changes: EntryChanges<'_>,
) -> sqlx::Result<NutritionEntry> {
    sqlx::query_as::<_, NutritionEntry>(&format!(
        r#"
        UPDATE nutrition_entries SET
            name       = COALESCE($2, name),
            date       = COALESCE($3, date),
            meal_type  = COALESCE($4, meal_type),
            calories   = COALESCE($5, calories),
            carbs      = COALESCE($6, carbs),
            proteins   = COALESCE($7, proteins),
            fats       = COALESCE($8, fats),
            carb_units = $9
        WHERE id = $1
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.name)
    .bind(changes.date)
    .bind(changes.meal_type)
    .bind(changes.calories)
    .bind(changes.carbs)
    .bind(changes.proteins)
    .bind(changes.fats)
    .bind(changes.carb_units)
    .fetch_one(db)
    .await
}

pub async fn delete_entry(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM nutrition_entries WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Most-recent-first listing with optional meal-type filter and optional
/// inclusive day window. A `None` limit means no limit.
pub async fn list_recent(
    db: &PgPool,
    user_id: Uuid,
    meal_type: Option<MealType>,
    window: Option<(OffsetDateTime, OffsetDateTime)>,
    limit: Option<i64>,
) -> sqlx::Result<Vec<NutritionEntry>> {
    let (from, to) = window.map_or((None, None), |(a, b)| (Some(a), Some(b)));
    sqlx::query_as::<_, NutritionEntry>(&format!(
        r#"
        SELECT {ENTRY_COLUMNS}
        FROM nutrition_entries
        WHERE user_id = $1
          AND ($2::meal_type IS NULL OR meal_type = $2)
          AND ($3::timestamptz IS NULL OR date BETWEEN $3 AND $4)
        ORDER BY created_at DESC
        LIMIT $5
        "#
    ))
    .bind(user_id)
    .bind(meal_type)
    .bind(from)
    .bind(to)
    .bind(limit)
    .fetch_all(db)
    .await
}
