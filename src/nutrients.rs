use serde::{Deserialize, Serialize};

/// Energy conversion constant, kJ per kcal.
pub const KJ_PER_KCAL: f64 = 4.184;

/// Carbohydrate units: one unit per 10 g of carbs. Stored unrounded;
/// rounding to one decimal is a display concern. Every write path derives
/// this server-side, it is never accepted from a caller.
pub fn carb_units(carbs: f64) -> f64 {
    carbs / 10.0
}

/// Canonical per-100g nutrient record. All fields are finite and
/// non-negative after normalization; missing source fields become 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories_per_100g: f64,
    pub carbs_per_100g: f64,
    pub proteins_per_100g: f64,
    pub fats_per_100g: f64,
}

/// Raw nutrient map as the external catalog ships it: energy may be kcal
/// or kJ, per-100g keys may be absent in favor of per-serving ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNutrients {
    #[serde(rename = "energy-kcal_100g")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(rename = "energy-kcal")]
    pub energy_kcal: Option<f64>,
    /// Plain `energy` is kilojoules.
    #[serde(rename = "energy")]
    pub energy_kj: Option<f64>,
    pub carbohydrates_100g: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub proteins_100g: Option<f64>,
    pub proteins: Option<f64>,
    pub fat_100g: Option<f64>,
    pub fat: Option<f64>,
}

impl RawNutrients {
    /// True when no energy or macro key is populated at all. The adapter
    /// treats such records as malformed upstream data, not as zeroes.
    pub fn is_vacant(&self) -> bool {
        self.energy_kcal_100g.is_none()
            && self.energy_kcal.is_none()
            && self.energy_kj.is_none()
            && self.carbohydrates_100g.is_none()
            && self.carbohydrates.is_none()
            && self.proteins_100g.is_none()
            && self.proteins.is_none()
            && self.fat_100g.is_none()
            && self.fat.is_none()
    }
}

fn clamp(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Normalize a raw nutrient map into a per-100g profile.
///
/// Priority per field: the `_100g` key, then the bare key, and for energy
/// finally kilojoules divided by 4.184. Anything unresolved is 0.
/// Pure and total, never fails.
pub fn normalize(raw: &RawNutrients) -> NutrientProfile {
    let calories = raw
        .energy_kcal_100g
        .or(raw.energy_kcal)
        .or(raw.energy_kj.map(|kj| kj / KJ_PER_KCAL))
        .unwrap_or(0.0);
    let carbs = raw.carbohydrates_100g.or(raw.carbohydrates).unwrap_or(0.0);
    let proteins = raw.proteins_100g.or(raw.proteins).unwrap_or(0.0);
    let fats = raw.fat_100g.or(raw.fat).unwrap_or(0.0);

    NutrientProfile {
        calories_per_100g: clamp(calories),
        carbs_per_100g: clamp(carbs),
        proteins_per_100g: clamp(proteins),
        fats_per_100g: clamp(fats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carb_units_is_one_tenth_of_carbs() {
        assert_eq!(carb_units(15.0), 1.5);
        assert_eq!(carb_units(30.0), 3.0);
        assert_eq!(carb_units(0.0), 0.0);
        // Unrounded.
        assert_eq!(carb_units(12.34), 1.234);
    }

    #[test]
    fn empty_map_normalizes_to_all_zero() {
        let profile = normalize(&RawNutrients::default());
        assert_eq!(profile.calories_per_100g, 0.0);
        assert_eq!(profile.carbs_per_100g, 0.0);
        assert_eq!(profile.proteins_per_100g, 0.0);
        assert_eq!(profile.fats_per_100g, 0.0);
    }

    #[test]
    fn kilojoules_convert_when_kcal_absent() {
        let raw = RawNutrients {
            energy_kj: Some(2255.0),
            ..Default::default()
        };
        let profile = normalize(&raw);
        assert!((profile.calories_per_100g - 2255.0 / 4.184).abs() < 1e-9);
    }

    #[test]
    fn per_100g_kcal_wins_over_kj() {
        let raw = RawNutrients {
            energy_kcal_100g: Some(539.0),
            energy_kcal: Some(100.0),
            energy_kj: Some(9999.0),
            ..Default::default()
        };
        assert_eq!(normalize(&raw).calories_per_100g, 539.0);
    }

    #[test]
    fn bare_key_used_when_100g_missing() {
        let raw = RawNutrients {
            carbohydrates: Some(57.5),
            ..Default::default()
        };
        assert_eq!(normalize(&raw).carbs_per_100g, 57.5);
    }

    #[test]
    fn negative_and_nan_inputs_clamp_to_zero() {
        let raw = RawNutrients {
            proteins_100g: Some(-3.0),
            fat_100g: Some(f64::NAN),
            ..Default::default()
        };
        let profile = normalize(&raw);
        assert_eq!(profile.proteins_per_100g, 0.0);
        assert_eq!(profile.fats_per_100g, 0.0);
    }

    #[test]
    fn vacant_detection() {
        assert!(RawNutrients::default().is_vacant());
        let raw = RawNutrients {
            fat: Some(0.0),
            ..Default::default()
        };
        assert!(!raw.is_vacant());
    }

    #[test]
    fn deserializes_catalog_keys() {
        let raw: RawNutrients = serde_json::from_str(
            r#"{"energy-kcal_100g": 539, "carbohydrates_100g": 57.5, "proteins_100g": 6.3, "fat_100g": 30.9}"#,
        )
        .unwrap();
        let profile = normalize(&raw);
        assert_eq!(profile.calories_per_100g, 539.0);
        assert_eq!(profile.fats_per_100g, 30.9);
    }
}
