//! Stock side of the kitchen: raw ingredients, semi-finished preparations
//! made from them, and the warehouses they are kept in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RestaurantId;

pub type IngredientId = Uuid;
pub type SemiFinishedId = Uuid;
pub type WarehouseId = Uuid;

/// Unit a stock quantity is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    G,
    L,
    Ml,
    Pcs,
    M,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::L => "l",
            Unit::Ml => "ml",
            Unit::Pcs => "pcs",
            Unit::M => "m",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Unit::Kg => "Kiloqram",
            Unit::G => "Qram",
            Unit::L => "Litr",
            Unit::Ml => "Millilitr",
            Unit::Pcs => "Ədəd",
            Unit::M => "Metr",
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kg" => Ok(Unit::Kg),
            "g" => Ok(Unit::G),
            "l" => Ok(Unit::L),
            "ml" => Ok(Unit::Ml),
            "pcs" => Ok(Unit::Pcs),
            "m" => Ok(Unit::M),
            other => Err(format!("unknown unit: {other}")),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything counted in stock with a reorder threshold.
pub trait Stocked {
    fn quantity(&self) -> f64;
    fn min_quantity(&self) -> f64;

    /// At or below the reorder threshold.
    fn is_low_stock(&self) -> bool {
        self.quantity() <= self.min_quantity()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub unit: Unit,
    pub quantity: f64,
    pub min_quantity: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Amount of one ingredient that goes into a semi-finished item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: IngredientId,
    pub quantity: f64,
}

/// A preparation made in-house from ingredients, such as dough or sauce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemiFinished {
    pub id: SemiFinishedId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub unit: Unit,
    pub quantity: f64,
    pub min_quantity: f64,
    pub ingredients: Vec<RecipeLine>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SemiFinished {
    pub fn uses(&self, ingredient_id: IngredientId) -> bool {
        self.ingredients
            .iter()
            .any(|line| line.ingredient_id == ingredient_id)
    }
}

impl Stocked for Ingredient {
    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn min_quantity(&self) -> f64 {
        self.min_quantity
    }
}

impl Stocked for SemiFinished {
    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn min_quantity(&self) -> f64 {
        self.min_quantity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Active rows at or below their reorder threshold.
pub fn low_stock<T: Stocked>(items: &[T], is_active: impl Fn(&T) -> bool) -> Vec<&T> {
    items
        .iter()
        .filter(|item| is_active(item) && item.is_low_stock())
        .collect()
}
