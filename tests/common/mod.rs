// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Utc};
use tabletop::application::BackOfficeService;
use tabletop::domain::{NewRestaurant, Restaurant};
use tempfile::TempDir;

pub const ADMIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const RESTAURANT_PASSWORD: &str = "secret1";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BackOfficeService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BackOfficeService::init(db_path.to_str().unwrap()).await?;
    service.bootstrap_admin(ADMIN, ADMIN_PASSWORD).await?;
    Ok((service, temp_dir))
}

/// Helper to parse an RFC 3339 timestamp into DateTime<Utc>
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn restaurant_request(name: &str, username: &str) -> NewRestaurant {
    NewRestaurant {
        name: name.into(),
        username: username.into(),
        password: RESTAURANT_PASSWORD.into(),
        currency: "AZN".into(),
        email: None,
        phone: None,
        address: None,
    }
}

/// Log in as admin, create a restaurant, and log in as that restaurant.
pub async fn login_as_new_restaurant(
    service: &BackOfficeService,
    name: &str,
    username: &str,
) -> Result<Restaurant> {
    service.login(ADMIN, ADMIN_PASSWORD).await?;
    let restaurant = service
        .create_restaurant(restaurant_request(name, username))
        .await?;
    service.login(username, RESTAURANT_PASSWORD).await?;
    Ok(restaurant)
}

/// The two orders of the January 5th scenario, as the point of sale stores them.
pub const SCENARIO_ORDERS: &str = r#"[
    {
        "id": "order-a",
        "table_number": 1,
        "items": [
            {"productName": "Espresso", "price": "3.50", "quantity": 2},
            {"productName": "Tiramisu", "price": "6.50", "quantity": 1}
        ],
        "total": "15.93",
        "payment_method": "cash",
        "completed_at": "2024-01-05T12:00:00Z"
    },
    {
        "id": "order-b",
        "table_number": 2,
        "items": [
            {"productName": "Pizza Marqarita", "price": "12.00", "quantity": 1},
            {"productName": "Cola", "price": "2.50", "quantity": 2}
        ],
        "total": "20.06",
        "payment_method": "card",
        "completed_at": "2024-01-05T13:00:00Z"
    }
]"#;
