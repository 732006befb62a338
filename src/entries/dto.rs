use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::repo::{MealType, NutritionEntry};

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub meal_type: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Manual entries seed the shared community pool; catalog picks do not.
    #[serde(default)]
    pub is_manual_entry: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntryRequest {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub proteins: Option<f64>,
    pub fats: Option<f64>,
    pub meal_type: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub meal_type: Option<String>,
    pub date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct RollupParams {
    pub date: String,
    pub meal_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct NutrientSums {
    pub calories: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
}

impl NutrientSums {
    pub fn add(&mut self, entry: &NutritionEntry) {
        self.calories += entry.calories;
        self.carbs += entry.carbs;
        self.proteins += entry.proteins;
        self.fats += entry.fats;
    }
}

#[derive(Debug, Serialize)]
pub struct DailyRollup {
    pub date: String,
    pub total_nutrition: NutrientSums,
    pub meals: BTreeMap<MealType, Vec<NutritionEntry>>,
}
