use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Cents, RestaurantId, amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }

    /// Label shown on receipts and in the order list.
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Nağd",
            PaymentMethod::Card => "Kart",
            PaymentMethod::Online => "Online",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "online" => Ok(PaymentMethod::Online),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line on a completed order. The product name is the
/// grouping key for sales rankings; it is not a reference to a product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub product_name: String,
    #[serde(with = "amount")]
    pub price: Cents,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_name: impl Into<String>, price: Cents, quantity: u32) -> Self {
        Self {
            product_name: product_name.into(),
            price,
            quantity,
        }
    }

    /// Price times quantity, clamped to the `Cents` range.
    pub fn line_total(&self) -> Cents {
        self.price.saturating_mul(Cents::from(self.quantity))
    }

    /// Decode a loosely typed item. Entries without a product name are
    /// dropped; unreadable prices and quantities count as zero.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let product_name = obj
            .get("product_name")
            .or_else(|| obj.get("productName"))?
            .as_str()?
            .to_string();
        let price = obj.get("price").and_then(amount::from_value).unwrap_or(0);
        let quantity = obj.get("quantity").and_then(quantity_from_value).unwrap_or(0);

        Some(Self {
            product_name,
            price,
            quantity,
        })
    }
}

fn quantity_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|q| u32::try_from(q).ok()),
        Value::String(s) => s.trim().split('.').next()?.parse().ok(),
        _ => None,
    }
}

/// Decode a stored `items` column. Anything that is not a list yields no items.
pub fn line_items_from_value(value: &Value) -> Vec<LineItem> {
    match value {
        Value::Array(entries) => entries.iter().filter_map(LineItem::from_value).collect(),
        _ => Vec::new(),
    }
}

fn lenient_items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<LineItem>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(line_items_from_value).unwrap_or_default())
}

/// A completed, paid transaction. Written once at checkout by the point of
/// sale and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedOrder {
    pub id: String,
    /// Assigned from the importing session when absent in the payload.
    #[serde(default)]
    pub restaurant_id: RestaurantId,
    pub table_number: i64,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<LineItem>,
    #[serde(default, with = "amount")]
    pub subtotal: Cents,
    #[serde(default, with = "amount")]
    pub discount: Cents,
    #[serde(default, with = "amount")]
    pub tax: Cents,
    #[serde(with = "amount")]
    pub total: Cents,
    pub payment_method: PaymentMethod,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_by: Option<String>,
}

/// Assembles a completed order and derives its money columns from the lines.
pub struct OrderBuilder {
    id: Option<String>,
    table_number: i64,
    payment_method: PaymentMethod,
    items: Vec<LineItem>,
    discount: Cents,
    tax_rate_percent: f64,
    completed_at: Option<DateTime<Utc>>,
    completed_by: Option<String>,
}

impl OrderBuilder {
    pub fn new(table_number: i64, payment_method: PaymentMethod) -> Self {
        Self {
            id: None,
            table_number,
            payment_method,
            items: Vec::new(),
            discount: 0,
            tax_rate_percent: 0.0,
            completed_at: None,
            completed_by: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn item(mut self, product_name: impl Into<String>, price: Cents, quantity: u32) -> Self {
        self.items.push(LineItem::new(product_name, price, quantity));
        self
    }

    pub fn with_discount(mut self, discount: Cents) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_tax_rate(mut self, percent: f64) -> Self {
        self.tax_rate_percent = percent;
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn completed_by(mut self, name: impl Into<String>) -> Self {
        self.completed_by = Some(name.into());
        self
    }

    /// total = subtotal - discount + tax, where tax is charged on the
    /// discounted amount and rounded to the nearest minor unit.
    pub fn build(self, restaurant_id: RestaurantId) -> CompletedOrder {
        let subtotal = self
            .items
            .iter()
            .fold(0, |sum: Cents, item| sum.saturating_add(item.line_total()));
        let taxable = subtotal.saturating_sub(self.discount);
        let tax = (taxable as f64 * self.tax_rate_percent / 100.0).round() as Cents;

        CompletedOrder {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            restaurant_id,
            table_number: self.table_number,
            items: self.items,
            subtotal,
            discount: self.discount,
            tax,
            total: taxable.saturating_add(tax),
            payment_method: self.payment_method,
            completed_at: self.completed_at.unwrap_or_else(Utc::now),
            completed_by: self.completed_by,
        }
    }
}
