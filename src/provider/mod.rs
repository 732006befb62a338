mod open_food_facts;

pub use open_food_facts::OpenFoodFactsClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::nutrients::NutrientProfile;

/// Fixed page size for external catalog lookups.
pub const PAGE_SIZE: u32 = 10;

/// One validated record from the external catalog. Ephemeral: fetched per
/// request and never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalFoodRecord {
    pub name: String,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub nutrients: NutrientProfile,
}

/// One page of external search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodPage {
    pub records: Vec<ExternalFoodRecord>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// External food catalog, treated as an opaque provider of raw product
/// pages. Failures surface as `AppError::ProviderUnavailable`; an empty
/// result page is not an error.
#[async_trait]
pub trait FoodProvider: Send + Sync {
    async fn search(&self, query: &str, page: u32) -> Result<FoodPage, AppError>;
}
