use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Community-contributed food item, insert-only. Edits go through the
/// owner's nutrition entry, never through the shared record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SharedFoodItem {
    pub id: Uuid,
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carb_units: f64,
    pub grams: f64,
    pub created_by: Uuid,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
}

/// One grouped row of historical entries: identical name and nutrient
/// values collapsed, with how often that combination was logged.
#[derive(Debug, Clone, FromRow)]
pub struct GroupedHistoryRow {
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub frequency: i64,
}

/// Escape `%`/`_` so user input stays a literal substring match.
pub fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn shared_by_name(
    db: &PgPool,
    query: &str,
    limit: i64,
) -> sqlx::Result<Vec<SharedFoodItem>> {
    sqlx::query_as::<_, SharedFoodItem>(
        r#"
        SELECT id, name, calories, carbs, proteins, fats, carb_units, grams,
               created_by, is_verified, created_at
        FROM shared_food_items
        WHERE name ILIKE $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(like_pattern(query))
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn own_history(
    db: &PgPool,
    user_id: Uuid,
    query: &str,
    limit: i64,
) -> sqlx::Result<Vec<GroupedHistoryRow>> {
    sqlx::query_as::<_, GroupedHistoryRow>(
        r#"
        SELECT name, calories, carbs, proteins, fats, COUNT(*) AS frequency
        FROM nutrition_entries
        WHERE user_id = $1 AND name ILIKE $2
        GROUP BY name, calories, carbs, proteins, fats
        ORDER BY frequency DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(like_pattern(query))
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn others_history(
    db: &PgPool,
    user_id: Uuid,
    query: &str,
    limit: i64,
) -> sqlx::Result<Vec<GroupedHistoryRow>> {
    sqlx::query_as::<_, GroupedHistoryRow>(
        r#"
        SELECT name, calories, carbs, proteins, fats, COUNT(*) AS frequency
        FROM nutrition_entries
        WHERE user_id <> $1 AND name ILIKE $2
        GROUP BY name, calories, carbs, proteins, fats
        ORDER BY frequency DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(like_pattern(query))
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn insert_shared_item(
    db: &PgPool,
    created_by: Uuid,
    name: &str,
    calories: f64,
    carbs: f64,
    proteins: f64,
    fats: f64,
    carb_units: f64,
) -> sqlx::Result<SharedFoodItem> {
    sqlx::query_as::<_, SharedFoodItem>(
        r#"
        INSERT INTO shared_food_items
            (name, calories, carbs, proteins, fats, carb_units, grams, created_by, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6, 100, $7, FALSE)
        RETURNING id, name, calories, carbs, proteins, fats, carb_units, grams,
                  created_by, is_verified, created_at
        "#,
    )
    .bind(name)
    .bind(calories)
    .bind(carbs)
    .bind(proteins)
    .bind(fats)
    .bind(carb_units)
    .bind(created_by)
    .fetch_one(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("oat"), "%oat%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
