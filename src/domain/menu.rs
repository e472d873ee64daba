use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, RestaurantId, amount};

pub type CategoryId = Uuid;
pub type SubCategoryId = Uuid;
pub type ProductId = Uuid;
pub type ModifierId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Second menu level. A sub-category always sits under one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub restaurant_id: RestaurantId,
    pub category_id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub restaurant_id: RestaurantId,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub name: String,
    #[serde(with = "amount")]
    pub price: Cents,
    pub description: Option<String>,
    pub barcode: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// Paid or free add-on offered with products, such as extra cheese.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: ModifierId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    /// Zero for free modifiers.
    #[serde(with = "amount")]
    pub price: Cents,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Random 13-digit code for products entered without a barcode.
pub fn generate_barcode() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000_000u64..10_000_000_000_000u64)
        .to_string()
}
