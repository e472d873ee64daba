//! Typed, validated payloads for every write that reaches the repository.

use thiserror::Error;

use super::{
    BranchId, CategoryId, Cents, DiningTable, HallId, Product, RecipeLine, StaffRole,
    SubCategoryId, TableId, Unit,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn require_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < 3 {
        return Err(ValidationError::new(
            "username",
            "must be at least 3 characters",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 6 {
        return Err(ValidationError::new(
            "password",
            "must be at least 6 characters",
        ));
    }
    Ok(())
}

/// Accepts `local@domain.tld`: no whitespace, a single '@', and a dot
/// somewhere inside the domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::new("email", "not a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_inner_dot {
        return Err(invalid());
    }
    Ok(())
}

/// 10 to 15 digits once spaces, dashes and parentheses are removed.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let valid = (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(ValidationError::new(
            "phone",
            "must contain 10 to 15 digits",
        ));
    }
    Ok(())
}

pub fn validate_price(price: Cents) -> Result<(), ValidationError> {
    if price <= 0 {
        return Err(ValidationError::new("price", "must be greater than 0"));
    }
    Ok(())
}

/// At least four characters.
pub fn validate_staff_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 4 {
        return Err(ValidationError::new(
            "password",
            "must be at least 4 characters",
        ));
    }
    Ok(())
}

pub fn validate_stock_quantity(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(field, "must be zero or more"));
    }
    Ok(())
}

fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "currency",
            "must be a three-letter ISO code",
        ));
    }
    Ok(())
}

fn validate_optional(
    value: Option<&str>,
    check: fn(&str) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => check(v),
        None => Ok(()),
    }
}

/// Table numbers are unique per restaurant. `exclude` skips the row being edited.
pub fn ensure_unique_table_number(
    number: i64,
    existing: &[DiningTable],
    exclude: Option<TableId>,
) -> Result<(), ValidationError> {
    let taken = existing
        .iter()
        .any(|t| t.number == number && Some(t.id) != exclude);
    if taken {
        return Err(ValidationError::new(
            "number",
            format!("table {number} already exists"),
        ));
    }
    Ok(())
}

/// Product names are unique within a category, ignoring case.
pub fn ensure_unique_product_name(
    name: &str,
    category_id: CategoryId,
    existing: &[Product],
) -> Result<(), ValidationError> {
    let lowered = name.to_lowercase();
    let taken = existing
        .iter()
        .any(|p| p.category_id == category_id && p.name.to_lowercase() == lowered);
    if taken {
        return Err(ValidationError::new(
            "name",
            format!("product '{name}' already exists in this category"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub name: String,
    pub username: String,
    pub password: String,
    pub currency: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewRestaurant {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_currency_code(&self.currency)?;
        validate_optional(self.email.as_deref(), validate_email)?;
        validate_optional(self.phone.as_deref(), validate_phone)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BranchRequest {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl BranchRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        validate_optional(self.phone.as_deref(), validate_phone)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HallRequest {
    pub name: String,
    pub branch_id: Option<BranchId>,
}

impl HallRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)
    }
}

#[derive(Debug, Clone)]
pub struct TableRequest {
    pub number: i64,
    pub seats: u32,
    pub hall_id: Option<HallId>,
}

impl TableRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.number <= 0 {
            return Err(ValidationError::new("number", "must be positive"));
        }
        if self.seats == 0 {
            return Err(ValidationError::new("seats", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProductRequest {
    pub name: String,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub price: Cents,
    pub description: Option<String>,
    pub barcode: Option<String>,
}

impl ProductRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        validate_price(self.price)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub price: Option<Cents>,
    pub is_available: Option<bool>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.price {
            Some(price) => validate_price(price),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DepartmentRequest {
    pub name: String,
    pub description: Option<String>,
}

impl DepartmentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)
    }
}

#[derive(Debug, Clone)]
pub struct SubCategoryRequest {
    pub name: String,
    pub category_id: CategoryId,
}

impl SubCategoryRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)
    }
}

#[derive(Debug, Clone)]
pub struct StaffUserRequest {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub role: StaffRole,
    pub branch_id: Option<BranchId>,
}

impl StaffUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        require_name("full_name", &self.full_name)?;
        validate_staff_password(&self.password)
    }
}

/// Edit of a staff account. The password is only replaced when given.
#[derive(Debug, Clone)]
pub struct StaffUserUpdate {
    pub full_name: String,
    pub role: StaffRole,
    pub branch_id: Option<BranchId>,
    pub is_active: bool,
    pub password: Option<String>,
}

impl StaffUserUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("full_name", &self.full_name)?;
        validate_optional(self.password.as_deref(), validate_staff_password)
    }
}

#[derive(Debug, Clone)]
pub struct IngredientRequest {
    pub name: String,
    pub unit: Unit,
    pub quantity: f64,
    pub min_quantity: f64,
    pub is_active: bool,
}

impl IngredientRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        validate_stock_quantity("quantity", self.quantity)?;
        validate_stock_quantity("min_quantity", self.min_quantity)
    }
}

#[derive(Debug, Clone)]
pub struct ModifierRequest {
    pub name: String,
    pub price: Cents,
    pub is_active: bool,
}

impl ModifierRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        if self.price < 0 {
            return Err(ValidationError::new("price", "must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SemiFinishedRequest {
    pub name: String,
    pub unit: Unit,
    pub quantity: f64,
    pub min_quantity: f64,
    pub ingredients: Vec<RecipeLine>,
    pub is_active: bool,
}

impl SemiFinishedRequest {
    /// A recipe needs at least one ingredient, each listed once with a
    /// positive amount.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        validate_stock_quantity("quantity", self.quantity)?;
        validate_stock_quantity("min_quantity", self.min_quantity)?;

        if self.ingredients.is_empty() {
            return Err(ValidationError::new(
                "ingredients",
                "at least one ingredient is required",
            ));
        }
        for (i, line) in self.ingredients.iter().enumerate() {
            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                return Err(ValidationError::new(
                    "ingredients",
                    "every ingredient needs a quantity greater than 0",
                ));
            }
            if self.ingredients[..i]
                .iter()
                .any(|prev| prev.ingredient_id == line.ingredient_id)
            {
                return Err(ValidationError::new(
                    "ingredients",
                    "an ingredient is listed more than once",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TableStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn restaurant_request() -> NewRestaurant {
        NewRestaurant {
            name: "Nargiz".into(),
            username: "nargiz".into(),
            password: "secret1".into(),
            currency: "AZN".into(),
            email: Some("info@nargiz.az".into()),
            phone: Some("(050) 123-45-67".into()),
            address: None,
        }
    }

    #[test]
    fn test_valid_restaurant_request() {
        assert_eq!(restaurant_request().validate(), Ok(()));
    }

    #[test]
    fn test_restaurant_request_rejects_short_credentials() {
        let mut req = restaurant_request();
        req.username = "ab".into();
        assert_eq!(req.validate().unwrap_err().field, "username");

        let mut req = restaurant_request();
        req.password = "12345".into();
        assert_eq!(req.validate().unwrap_err().field, "password");
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@.b").is_err());
        assert!(validate_email("a@b.").is_err());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a b@c.de").is_err());
        assert!(validate_email("a@b@c.de").is_err());
    }

    #[test]
    fn test_phone_shapes() {
        assert!(validate_phone("0501234567").is_ok());
        assert!(validate_phone("+994 50 123 45 67").is_err());
        assert!(validate_phone("994 50 123 45 67").is_ok());
        assert!(validate_phone("12345").is_err());
    }

    #[test]
    fn test_price_must_be_positive() {
        assert!(validate_price(1).is_ok());
        assert!(validate_price(0).is_err());
        assert!(validate_price(-100).is_err());
    }

    #[test]
    fn test_table_number_uniqueness() {
        let existing = DiningTable {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            hall_id: None,
            number: 7,
            seats: 2,
            status: TableStatus::Available,
            created_at: Utc::now(),
        };
        let tables = vec![existing.clone()];

        assert!(ensure_unique_table_number(7, &tables, None).is_err());
        assert!(ensure_unique_table_number(7, &tables, Some(existing.id)).is_ok());
        assert!(ensure_unique_table_number(8, &tables, None).is_ok());
    }

    #[test]
    fn test_product_name_uniqueness_ignores_case() {
        let category = Uuid::new_v4();
        let products = vec![Product {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            category_id: category,
            sub_category_id: None,
            name: "Latte".into(),
            price: 400,
            description: None,
            barcode: "1234567890123".into(),
            is_available: true,
            created_at: Utc::now(),
        }];

        assert!(ensure_unique_product_name("LATTE", category, &products).is_err());
        assert!(ensure_unique_product_name("Latte", Uuid::new_v4(), &products).is_ok());
    }

    #[test]
    fn test_staff_password_is_shorter_than_account_password() {
        let mut req = StaffUserRequest {
            username: "aysel".into(),
            full_name: "Aysel Məmmədova".into(),
            password: "1234".into(),
            role: StaffRole::Waiter,
            branch_id: None,
        };
        assert_eq!(req.validate(), Ok(()));

        req.password = "123".into();
        assert_eq!(req.validate().unwrap_err().field, "password");

        req.password = "1234".into();
        req.full_name = "  ".into();
        assert_eq!(req.validate().unwrap_err().field, "full_name");
    }

    #[test]
    fn test_stock_quantities_must_be_non_negative() {
        let mut req = IngredientRequest {
            name: "Un".into(),
            unit: Unit::Kg,
            quantity: 0.0,
            min_quantity: 0.0,
            is_active: true,
        };
        assert_eq!(req.validate(), Ok(()));

        req.quantity = -0.5;
        assert_eq!(req.validate().unwrap_err().field, "quantity");

        req.quantity = 1.0;
        req.min_quantity = f64::NAN;
        assert_eq!(req.validate().unwrap_err().field, "min_quantity");
    }

    #[test]
    fn test_free_modifier_is_allowed() {
        let mut req = ModifierRequest {
            name: "Əlavə pendir".into(),
            price: 0,
            is_active: true,
        };
        assert_eq!(req.validate(), Ok(()));

        req.price = -1;
        assert_eq!(req.validate().unwrap_err().field, "price");
    }

    #[test]
    fn test_recipe_rules() {
        let flour = Uuid::new_v4();
        let mut req = SemiFinishedRequest {
            name: "Xəmir".into(),
            unit: Unit::Kg,
            quantity: 0.0,
            min_quantity: 1.0,
            ingredients: Vec::new(),
            is_active: true,
        };
        assert_eq!(req.validate().unwrap_err().field, "ingredients");

        req.ingredients = vec![RecipeLine {
            ingredient_id: flour,
            quantity: 0.0,
        }];
        assert_eq!(req.validate().unwrap_err().field, "ingredients");

        req.ingredients = vec![
            RecipeLine {
                ingredient_id: flour,
                quantity: 0.8,
            },
            RecipeLine {
                ingredient_id: flour,
                quantity: 0.2,
            },
        ];
        assert!(req.validate().unwrap_err().message.contains("more than once"));

        req.ingredients.pop();
        assert_eq!(req.validate(), Ok(()));
    }
}
