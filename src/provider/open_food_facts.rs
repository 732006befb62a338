use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ExternalFoodRecord, FoodPage, FoodProvider, PAGE_SIZE};
use crate::config::ProviderConfig;
use crate::error::AppError;
use crate::nutrients::{self, RawNutrients};

/// Open Food Facts search client.
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<RawProduct>,
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    product_name: Option<String>,
    brands: Option<String>,
    image_url: Option<String>,
    nutriments: Option<RawNutrients>,
}

impl OpenFoodFactsClient {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Upstream matching also covers fields we do not surface (description,
    /// tags), so re-check name/brand containment before accepting a record.
    fn accept(product: RawProduct, query_lower: &str) -> Option<ExternalFoodRecord> {
        let name = product.product_name.filter(|n| !n.trim().is_empty())?;
        let nutriments = product.nutriments.filter(|n| !n.is_vacant())?;

        let brand = product.brands.filter(|b| !b.trim().is_empty());
        let name_matches = name.to_lowercase().contains(query_lower);
        let brand_matches = brand
            .as_deref()
            .is_some_and(|b| b.to_lowercase().contains(query_lower));
        if !name_matches && !brand_matches {
            return None;
        }

        Some(ExternalFoodRecord {
            name,
            brand,
            image_url: product.image_url,
            nutrients: nutrients::normalize(&nutriments),
        })
    }
}

#[async_trait]
impl FoodProvider for OpenFoodFactsClient {
    async fn search(&self, query: &str, page: u32) -> Result<FoodPage, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::validation("search query must not be empty"));
        }
        if page == 0 {
            return Err(AppError::validation("page must be >= 1"));
        }

        let url = format!("{}/cgi/search.pl", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page", &page.to_string()),
                ("page_size", &PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, query, "food catalog request failed");
                AppError::ProviderUnavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(AppError::ProviderUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("malformed response: {e}")))?;

        let query_lower = query.to_lowercase();
        let records: Vec<ExternalFoodRecord> = body
            .products
            .into_iter()
            .filter_map(|p| Self::accept(p, &query_lower))
            .collect();

        let total_count = body.count;
        let total_pages = total_count.div_ceil(u64::from(PAGE_SIZE)) as u32;
        debug!(query, page, total_count, kept = records.len(), "catalog page fetched");

        Ok(FoodPage {
            records,
            page,
            total_pages,
            total_count,
        })
    }
}
