use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RestaurantId = Uuid;
pub type BranchId = Uuid;
pub type HallId = Uuid;
pub type TableId = Uuid;
pub type DepartmentId = Uuid;
pub type StaffUserId = Uuid;

/// A tenant of the console. Each restaurant logs in with its own credentials
/// and only ever sees its own rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub currency: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn new(name: String, username: String, password_hash: String, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            username,
            password_hash,
            currency,
            email: None,
            phone: None,
            address: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// Console operator with access to every restaurant.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hall {
    pub id: HallId,
    pub restaurant_id: RestaurantId,
    pub branch_id: Option<BranchId>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TableStatus::Available => "Boş",
            TableStatus::Occupied => "Dolu",
            TableStatus::Reserved => "Rezerv",
        }
    }
}

impl FromStr for TableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(TableStatus::Available),
            "occupied" => Ok(TableStatus::Occupied),
            "reserved" => Ok(TableStatus::Reserved),
            other => Err(format!("unknown table status: {other}")),
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical table, identified to guests and orders by its number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: TableId,
    pub restaurant_id: RestaurantId,
    pub hall_id: Option<HallId>,
    pub number: i64,
    pub seats: u32,
    pub status: TableStatus,
    pub created_at: DateTime<Utc>,
}

impl DiningTable {
    pub fn is_occupied(&self) -> bool {
        self.status == TableStatus::Occupied
    }
}

/// Number of tables currently seated.
pub fn active_table_count(tables: &[DiningTable]) -> usize {
    tables.iter().filter(|t| t.is_occupied()).count()
}

/// Kitchen or bar station orders are routed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Cashier,
    Waiter,
    Kitchen,
    Manager,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Cashier => "cashier",
            StaffRole::Waiter => "waiter",
            StaffRole::Kitchen => "kitchen",
            StaffRole::Manager => "manager",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StaffRole::Cashier => "Kassir",
            StaffRole::Waiter => "Ofisiant",
            StaffRole::Kitchen => "Mətbəx",
            StaffRole::Manager => "Menecer",
        }
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cashier" => Ok(StaffRole::Cashier),
            "waiter" => Ok(StaffRole::Waiter),
            "kitchen" => Ok(StaffRole::Kitchen),
            "manager" => Ok(StaffRole::Manager),
            other => Err(format!("unknown staff role: {other}")),
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-of-sale operator of one restaurant, optionally tied to a branch.
/// Staff accounts sign in at the till, not at this console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: StaffUserId,
    pub restaurant_id: RestaurantId,
    pub branch_id: Option<BranchId>,
    pub username: String,
    pub full_name: String,
    pub role: StaffRole,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(number: i64, status: TableStatus) -> DiningTable {
        DiningTable {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            hall_id: None,
            number,
            seats: 4,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_table_status_parse() {
        for status in [
            TableStatus::Available,
            TableStatus::Occupied,
            TableStatus::Reserved,
        ] {
            assert_eq!(status.as_str().parse::<TableStatus>(), Ok(status));
        }
        assert!("broken".parse::<TableStatus>().is_err());
    }

    #[test]
    fn test_staff_role_parse() {
        assert_eq!("Waiter".parse::<StaffRole>(), Ok(StaffRole::Waiter));
        assert_eq!(StaffRole::Kitchen.to_string(), "kitchen");
        assert!("chef".parse::<StaffRole>().is_err());
    }

    #[test]
    fn test_active_table_count() {
        let tables = vec![
            table(1, TableStatus::Occupied),
            table(2, TableStatus::Available),
            table(3, TableStatus::Occupied),
            table(4, TableStatus::Reserved),
        ];
        assert_eq!(active_table_count(&tables), 2);
        assert_eq!(active_table_count(&[]), 0);
    }

    #[test]
    fn test_restaurant_hash_is_not_serialized() {
        let restaurant = Restaurant::new(
            "Dolma House".into(),
            "dolma".into(),
            "$argon2id$secret".into(),
            "AZN".into(),
        );
        let json = serde_json::to_string(&restaurant).unwrap();
        assert!(!json.contains("argon2"));
        assert!(restaurant.is_active);
    }
}
