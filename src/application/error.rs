use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("This operation requires an admin session")]
    AdminRequired,

    #[error("This operation requires a restaurant session")]
    RestaurantRequired,

    #[error("Restaurant is inactive: {0}")]
    RestaurantInactive(String),

    #[error("Admin already exists: {0}")]
    AdminAlreadyExists(String),

    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Hall not found: {0}")]
    HallNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    #[error("Sub-category not found: {0}")]
    SubCategoryNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Modifier not found: {0}")]
    ModifierNotFound(String),

    #[error("Staff user not found: {0}")]
    StaffUserNotFound(String),

    #[error("Ingredient not found: {0}")]
    IngredientNotFound(String),

    #[error("Ingredient is used by a semi-finished item: {0}")]
    IngredientInUse(String),

    #[error("Semi-finished item not found: {0}")]
    SemiFinishedNotFound(String),

    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(String),

    #[error("Department not found: {0}")]
    DepartmentNotFound(String),

    #[error("Order already recorded: {0}")]
    OrderAlreadyExists(String),

    #[error("Invalid {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid order payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
