use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::HashSet;
use std::fmt::Display;
use uuid::Uuid;

use crate::domain::{
    AdminUser, Branch, BranchId, BranchRequest, Category, CategoryId, CompletedOrder, DateRange,
    Department, DepartmentId, DepartmentRequest, DiningTable, Hall, HallId, HallRequest,
    Ingredient, IngredientId, IngredientRequest, Modifier, ModifierId, ModifierRequest,
    NewRestaurant, OrderBuilder, Period, Product, ProductId, ProductRequest, ProductUpdate,
    Restaurant, RestaurantId, SemiFinished, SemiFinishedId, SemiFinishedRequest, StaffUser,
    StaffUserId, StaffUserRequest, StaffUserUpdate, SubCategory, SubCategoryId,
    SubCategoryRequest, TableId, TableRequest, TableStatus, ValidationError, Warehouse,
    WarehouseId, active_table_count, ensure_unique_product_name, ensure_unique_table_number,
    generate_barcode, low_stock, require_name, validate_password, validate_username,
};
use crate::storage::Repository;

use super::feed::{ChangeEvent, Feeds, Record, RowFilter, Subscription};
use super::reporting::{
    AdminOverview, PeriodTotals, RestaurantOverview, StatisticsReport, build_statistics_report,
};
use super::session::{RestaurantScope, Session, SessionStore, hash_password, verify_password};
use super::AppError;

/// Back-office service: the single entry point for the console.
/// Every operation consults the session for who is acting and on which
/// restaurant's rows.
pub struct BackOfficeService {
    repo: Repository,
    session: SessionStore,
    feeds: Feeds,
}

/// Keep `record` only when it belongs to the restaurant in scope.
/// Rows of other restaurants are reported as missing.
fn owned<T: Record>(
    scope: &RestaurantScope,
    record: Option<T>,
    missing: impl FnOnce() -> AppError,
) -> Result<T, AppError> {
    match record {
        Some(record) if record.owner() == scope.restaurant_id => Ok(record),
        _ => Err(missing()),
    }
}

impl BackOfficeService {
    /// Create a new service with the given repository and no session.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            session: SessionStore::new(),
            feeds: Feeds::default(),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn feeds(&self) -> &Feeds {
        &self.feeds
    }

    // ========================
    // Accounts and sessions
    // ========================

    /// Create an admin account. Needs no session: it is how a fresh
    /// database gets its first operator.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminUser, AppError> {
        validate_username(username)?;
        validate_password(password)?;

        if self.repo.get_admin_by_username(username).await?.is_some() {
            return Err(AppError::AdminAlreadyExists(username.to_string()));
        }

        let admin = AdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };
        self.repo.save_admin(&admin).await?;

        tracing::info!(username, "admin account created");
        Ok(admin)
    }

    /// Check credentials against admin accounts first, then restaurants.
    /// On success the session store is initialised with the result.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        if let Some(admin) = self.repo.get_admin_by_username(username).await? {
            if verify_password(password, &admin.password_hash) {
                let session = Session::Admin {
                    username: admin.username,
                };
                self.session.initialize(session.clone());
                tracing::info!(username, "admin logged in");
                return Ok(session);
            }
        }

        let restaurant = match self.repo.get_restaurant_by_username(username).await? {
            Some(r) if verify_password(password, &r.password_hash) => r,
            _ => {
                tracing::warn!(username, "rejected login");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !restaurant.is_active {
            tracing::warn!(username, "login to inactive restaurant");
            return Err(AppError::RestaurantInactive(restaurant.name));
        }

        let session = Session::for_restaurant(&restaurant, None);
        self.session.initialize(session.clone());
        tracing::info!(username, restaurant_id = %restaurant.id, "restaurant logged in");
        Ok(session)
    }

    pub fn logout(&self) -> Option<Session> {
        let previous = self.session.clear();
        if let Some(session) = &previous {
            tracing::info!(user = session.display_name(), "logged out");
        }
        previous
    }

    /// Narrow the restaurant session to one of its branches.
    pub async fn select_branch(&self, branch_id: BranchId) -> Result<Session, AppError> {
        let scope = self.session.require_restaurant()?;
        self.owned_branch(&scope, branch_id).await?;

        let restaurant = self
            .repo
            .get_restaurant(scope.restaurant_id)
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(scope.restaurant_id.to_string()))?;

        let session = Session::for_restaurant(&restaurant, Some(branch_id));
        self.session.initialize(session.clone());
        Ok(session)
    }

    // ========================
    // Restaurants (admin)
    // ========================

    /// Create a restaurant account. Usernames are shared with admin accounts.
    pub async fn create_restaurant(&self, request: NewRestaurant) -> Result<Restaurant, AppError> {
        self.session.require_admin()?;
        request.validate()?;

        let taken = self
            .repo
            .get_restaurant_by_username(&request.username)
            .await?
            .is_some()
            || self
                .repo
                .get_admin_by_username(&request.username)
                .await?
                .is_some();
        if taken {
            return Err(AppError::UsernameTaken(request.username));
        }

        let password_hash = hash_password(&request.password)?;
        let mut restaurant = Restaurant::new(
            request.name,
            request.username,
            password_hash,
            request.currency,
        );
        restaurant.email = request.email;
        restaurant.phone = request.phone;
        restaurant.address = request.address;

        self.repo.save_restaurant(&restaurant).await?;
        tracing::info!(restaurant_id = %restaurant.id, name = %restaurant.name, "restaurant created");
        Ok(restaurant)
    }

    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>, AppError> {
        self.session.require_admin()?;
        Ok(self.repo.list_restaurants().await?)
    }

    pub async fn get_restaurant(&self, id: RestaurantId) -> Result<Restaurant, AppError> {
        self.session.require_admin()?;
        self.repo
            .get_restaurant(id)
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(id.to_string()))
    }

    pub async fn set_restaurant_active(
        &self,
        id: RestaurantId,
        active: bool,
    ) -> Result<Restaurant, AppError> {
        let mut restaurant = self.get_restaurant(id).await?;
        self.repo.set_restaurant_active(id, active).await?;
        restaurant.is_active = active;

        tracing::info!(restaurant_id = %id, active, "restaurant activation changed");
        Ok(restaurant)
    }

    /// Delete a restaurant and everything it owns.
    pub async fn delete_restaurant(&self, id: RestaurantId) -> Result<Restaurant, AppError> {
        let restaurant = self.get_restaurant(id).await?;
        self.repo.delete_restaurant(id).await?;

        tracing::info!(restaurant_id = %id, "restaurant deleted");
        Ok(restaurant)
    }

    // ========================
    // Branches
    // ========================

    pub async fn add_branch(&self, request: BranchRequest) -> Result<Branch, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let branch = Branch {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: request.name,
            address: request.address,
            phone: request.phone,
            created_at: Utc::now(),
        };
        self.repo.save_branch(&branch).await?;

        tracing::info!(branch_id = %branch.id, name = %branch.name, "branch added");
        self.feeds.branches.publish(ChangeEvent::Inserted(branch.clone()));
        Ok(branch)
    }

    pub async fn list_branches(&self) -> Result<Vec<Branch>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_branches(scope.restaurant_id).await?)
    }

    pub async fn update_branch(
        &self,
        id: BranchId,
        request: BranchRequest,
    ) -> Result<Branch, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let mut branch = self.owned_branch(&scope, id).await?;
        branch.name = request.name;
        branch.address = request.address;
        branch.phone = request.phone;
        self.repo.update_branch(&branch).await?;

        tracing::info!(branch_id = %id, "branch updated");
        self.feeds.branches.publish(ChangeEvent::Updated(branch.clone()));
        Ok(branch)
    }

    /// Delete a branch. Its halls and staff are kept without a branch.
    pub async fn delete_branch(&self, id: BranchId) -> Result<Branch, AppError> {
        let scope = self.session.require_restaurant()?;
        let branch = self.owned_branch(&scope, id).await?;
        let halls: Vec<Hall> = self
            .repo
            .list_halls(scope.restaurant_id)
            .await?
            .into_iter()
            .filter(|h| h.branch_id == Some(id))
            .collect();
        let staff: Vec<StaffUser> = self
            .repo
            .list_staff_users(scope.restaurant_id)
            .await?
            .into_iter()
            .filter(|u| u.branch_id == Some(id))
            .collect();

        self.repo.delete_branch(id).await?;
        tracing::info!(branch_id = %id, halls = halls.len(), staff = staff.len(), "branch deleted");

        for mut hall in halls {
            hall.branch_id = None;
            self.feeds.halls.publish(ChangeEvent::Updated(hall));
        }
        for mut user in staff {
            user.branch_id = None;
            self.feeds.staff.publish(ChangeEvent::Updated(user));
        }
        self.feeds.branches.publish(ChangeEvent::Deleted(branch.clone()));
        Ok(branch)
    }

    async fn owned_branch(&self, scope: &RestaurantScope, id: BranchId) -> Result<Branch, AppError> {
        owned(scope, self.repo.get_branch(id).await?, || {
            AppError::BranchNotFound(id.to_string())
        })
    }

    // ========================
    // Halls
    // ========================

    pub async fn add_hall(&self, request: HallRequest) -> Result<Hall, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        if let Some(branch_id) = request.branch_id {
            self.owned_branch(&scope, branch_id).await?;
        }

        let hall = Hall {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            branch_id: request.branch_id,
            name: request.name,
            created_at: Utc::now(),
        };
        self.repo.save_hall(&hall).await?;

        tracing::info!(hall_id = %hall.id, name = %hall.name, "hall added");
        self.feeds.halls.publish(ChangeEvent::Inserted(hall.clone()));
        Ok(hall)
    }

    pub async fn list_halls(&self) -> Result<Vec<Hall>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_halls(scope.restaurant_id).await?)
    }

    /// Rename a hall or move it to another branch.
    pub async fn update_hall(&self, id: HallId, request: HallRequest) -> Result<Hall, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        if let Some(branch_id) = request.branch_id {
            self.owned_branch(&scope, branch_id).await?;
        }

        let mut hall = self.owned_hall(&scope, id).await?;
        hall.name = request.name;
        hall.branch_id = request.branch_id;
        self.repo.update_hall(&hall).await?;

        tracing::info!(hall_id = %id, "hall updated");
        self.feeds.halls.publish(ChangeEvent::Updated(hall.clone()));
        Ok(hall)
    }

    /// Delete a hall. Its tables are kept without a hall.
    pub async fn delete_hall(&self, id: HallId) -> Result<Hall, AppError> {
        let scope = self.session.require_restaurant()?;
        let hall = self.owned_hall(&scope, id).await?;
        let detached: Vec<DiningTable> = self
            .repo
            .list_tables(scope.restaurant_id)
            .await?
            .into_iter()
            .filter(|t| t.hall_id == Some(id))
            .collect();

        self.repo.delete_hall(id).await?;
        tracing::info!(hall_id = %id, detached = detached.len(), "hall deleted");

        for mut table in detached {
            table.hall_id = None;
            self.feeds.tables.publish(ChangeEvent::Updated(table));
        }
        self.feeds.halls.publish(ChangeEvent::Deleted(hall.clone()));
        Ok(hall)
    }

    async fn owned_hall(&self, scope: &RestaurantScope, id: HallId) -> Result<Hall, AppError> {
        owned(scope, self.repo.get_hall(id).await?, || {
            AppError::HallNotFound(id.to_string())
        })
    }

    // ========================
    // Dining tables
    // ========================

    pub async fn add_table(&self, request: TableRequest) -> Result<DiningTable, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        if let Some(hall_id) = request.hall_id {
            self.owned_hall(&scope, hall_id).await?;
        }

        let existing = self.repo.list_tables(scope.restaurant_id).await?;
        ensure_unique_table_number(request.number, &existing, None)?;

        let table = DiningTable {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            hall_id: request.hall_id,
            number: request.number,
            seats: request.seats,
            status: TableStatus::Available,
            created_at: Utc::now(),
        };
        self.repo.save_table(&table).await?;

        tracing::info!(table_id = %table.id, number = table.number, "table added");
        self.feeds.tables.publish(ChangeEvent::Inserted(table.clone()));
        Ok(table)
    }

    pub async fn list_tables(&self) -> Result<Vec<DiningTable>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_tables(scope.restaurant_id).await?)
    }

    /// Number of occupied tables of the logged-in restaurant.
    pub async fn active_table_count(&self) -> Result<usize, AppError> {
        Ok(active_table_count(&self.list_tables().await?))
    }

    pub async fn update_table_status(
        &self,
        id: TableId,
        status: TableStatus,
    ) -> Result<DiningTable, AppError> {
        let scope = self.session.require_restaurant()?;
        let mut table = self.owned_table(&scope, id).await?;
        self.repo.update_table_status(id, status).await?;
        table.status = status;

        tracing::info!(table_id = %id, %status, "table status changed");
        self.feeds.tables.publish(ChangeEvent::Updated(table.clone()));
        Ok(table)
    }

    pub async fn delete_table(&self, id: TableId) -> Result<DiningTable, AppError> {
        let scope = self.session.require_restaurant()?;
        let table = self.owned_table(&scope, id).await?;
        self.repo.delete_table(id).await?;

        tracing::info!(table_id = %id, number = table.number, "table deleted");
        self.feeds.tables.publish(ChangeEvent::Deleted(table.clone()));
        Ok(table)
    }

    /// Find a table of the logged-in restaurant by its number.
    pub async fn find_table_by_number(&self, number: i64) -> Result<DiningTable, AppError> {
        self.list_tables()
            .await?
            .into_iter()
            .find(|t| t.number == number)
            .ok_or_else(|| AppError::TableNotFound(number.to_string()))
    }

    async fn owned_table(
        &self,
        scope: &RestaurantScope,
        id: TableId,
    ) -> Result<DiningTable, AppError> {
        owned(scope, self.repo.get_table(id).await?, || {
            AppError::TableNotFound(id.to_string())
        })
    }

    // ========================
    // Categories and products
    // ========================

    /// Category names are unique per restaurant, ignoring case.
    pub async fn add_category(&self, name: &str) -> Result<Category, AppError> {
        let scope = self.session.require_restaurant()?;
        require_name("name", name)?;
        let name = name.trim();
        self.ensure_category_name_free(&scope, name, None).await?;

        let category = Category {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.repo.save_category(&category).await?;

        tracing::info!(category_id = %category.id, name, "category added");
        self.feeds.categories.publish(ChangeEvent::Inserted(category.clone()));
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_categories(scope.restaurant_id).await?)
    }

    pub async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category, AppError> {
        let scope = self.session.require_restaurant()?;
        require_name("name", name)?;
        let name = name.trim();

        let mut category = self.owned_category(&scope, id).await?;
        self.ensure_category_name_free(&scope, name, Some(id)).await?;
        self.repo.rename_category(id, name).await?;
        category.name = name.to_string();

        tracing::info!(category_id = %id, name, "category renamed");
        self.feeds.categories.publish(ChangeEvent::Updated(category.clone()));
        Ok(category)
    }

    /// Delete a category together with its sub-categories and products.
    pub async fn delete_category(&self, id: CategoryId) -> Result<Category, AppError> {
        let scope = self.session.require_restaurant()?;
        let category = self.owned_category(&scope, id).await?;
        let products: Vec<Product> = self
            .repo
            .list_products(scope.restaurant_id)
            .await?
            .into_iter()
            .filter(|p| p.category_id == id)
            .collect();
        let sub_categories = self
            .repo
            .list_sub_categories(scope.restaurant_id, Some(id))
            .await?;

        self.repo.delete_category(id).await?;
        tracing::info!(
            category_id = %id,
            products = products.len(),
            sub_categories = sub_categories.len(),
            "category deleted"
        );

        for product in products {
            self.feeds.products.publish(ChangeEvent::Deleted(product));
        }
        for sub_category in sub_categories {
            self.feeds
                .sub_categories
                .publish(ChangeEvent::Deleted(sub_category));
        }
        self.feeds.categories.publish(ChangeEvent::Deleted(category.clone()));
        Ok(category)
    }

    async fn ensure_category_name_free(
        &self,
        scope: &RestaurantScope,
        name: &str,
        exclude: Option<CategoryId>,
    ) -> Result<(), AppError> {
        let lowered = name.to_lowercase();
        let exists = self
            .repo
            .list_categories(scope.restaurant_id)
            .await?
            .iter()
            .any(|c| Some(c.id) != exclude && c.name.to_lowercase() == lowered);
        if exists {
            return Err(AppError::CategoryAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    async fn owned_category(
        &self,
        scope: &RestaurantScope,
        id: CategoryId,
    ) -> Result<Category, AppError> {
        owned(scope, self.repo.get_category(id).await?, || {
            AppError::CategoryNotFound(id.to_string())
        })
    }

    /// Sub-category names are unique within their category, ignoring case.
    pub async fn add_sub_category(
        &self,
        request: SubCategoryRequest,
    ) -> Result<SubCategory, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        self.owned_category(&scope, request.category_id).await?;

        let name = request.name.trim().to_string();
        self.ensure_sub_category_name_free(&scope, request.category_id, &name, None)
            .await?;

        let sub_category = SubCategory {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            category_id: request.category_id,
            name,
            created_at: Utc::now(),
        };
        self.repo.save_sub_category(&sub_category).await?;

        tracing::info!(sub_category_id = %sub_category.id, name = %sub_category.name, "sub-category added");
        self.feeds
            .sub_categories
            .publish(ChangeEvent::Inserted(sub_category.clone()));
        Ok(sub_category)
    }

    /// Sub-categories of one category, or of the whole menu when `category_id` is `None`.
    pub async fn list_sub_categories(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<SubCategory>, AppError> {
        let scope = self.session.require_restaurant()?;
        if let Some(category_id) = category_id {
            self.owned_category(&scope, category_id).await?;
        }
        Ok(self
            .repo
            .list_sub_categories(scope.restaurant_id, category_id)
            .await?)
    }

    pub async fn update_sub_category(
        &self,
        id: SubCategoryId,
        name: &str,
    ) -> Result<SubCategory, AppError> {
        let scope = self.session.require_restaurant()?;
        require_name("name", name)?;
        let name = name.trim();

        let mut sub_category = self.owned_sub_category(&scope, id).await?;
        self.ensure_sub_category_name_free(&scope, sub_category.category_id, name, Some(id))
            .await?;
        self.repo.rename_sub_category(id, name).await?;
        sub_category.name = name.to_string();

        tracing::info!(sub_category_id = %id, name, "sub-category renamed");
        self.feeds
            .sub_categories
            .publish(ChangeEvent::Updated(sub_category.clone()));
        Ok(sub_category)
    }

    /// Delete a sub-category. Its products stay in the parent category.
    pub async fn delete_sub_category(&self, id: SubCategoryId) -> Result<SubCategory, AppError> {
        let scope = self.session.require_restaurant()?;
        let sub_category = self.owned_sub_category(&scope, id).await?;
        let detached: Vec<Product> = self
            .repo
            .list_products(scope.restaurant_id)
            .await?
            .into_iter()
            .filter(|p| p.sub_category_id == Some(id))
            .collect();

        self.repo.delete_sub_category(id).await?;
        tracing::info!(sub_category_id = %id, detached = detached.len(), "sub-category deleted");

        for mut product in detached {
            product.sub_category_id = None;
            self.feeds.products.publish(ChangeEvent::Updated(product));
        }
        self.feeds
            .sub_categories
            .publish(ChangeEvent::Deleted(sub_category.clone()));
        Ok(sub_category)
    }

    async fn owned_sub_category(
        &self,
        scope: &RestaurantScope,
        id: SubCategoryId,
    ) -> Result<SubCategory, AppError> {
        owned(scope, self.repo.get_sub_category(id).await?, || {
            AppError::SubCategoryNotFound(id.to_string())
        })
    }

    async fn ensure_sub_category_name_free(
        &self,
        scope: &RestaurantScope,
        category_id: CategoryId,
        name: &str,
        exclude: Option<SubCategoryId>,
    ) -> Result<(), AppError> {
        let lowered = name.to_lowercase();
        let exists = self
            .repo
            .list_sub_categories(scope.restaurant_id, Some(category_id))
            .await?
            .iter()
            .any(|c| Some(c.id) != exclude && c.name.to_lowercase() == lowered);
        if exists {
            return Err(ValidationError::new(
                "name",
                format!("sub-category '{name}' already exists in this category"),
            )
            .into());
        }
        Ok(())
    }

    /// Add a product. A barcode is generated when none is given.
    /// A sub-category, when given, must sit under the product's category.
    pub async fn add_product(&self, request: ProductRequest) -> Result<Product, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        self.owned_category(&scope, request.category_id).await?;
        if let Some(sub_category_id) = request.sub_category_id {
            let sub_category = self.owned_sub_category(&scope, sub_category_id).await?;
            if sub_category.category_id != request.category_id {
                return Err(ValidationError::new(
                    "sub_category_id",
                    "sub-category belongs to another category",
                )
                .into());
            }
        }

        let name = request.name.trim().to_string();
        let existing = self.repo.list_products(scope.restaurant_id).await?;
        ensure_unique_product_name(&name, request.category_id, &existing)?;

        let barcode = match request.barcode {
            Some(code) if !code.trim().is_empty() => code.trim().to_string(),
            _ => generate_barcode(),
        };

        let product = Product {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            category_id: request.category_id,
            sub_category_id: request.sub_category_id,
            name,
            price: request.price,
            description: request.description,
            barcode,
            is_available: true,
            created_at: Utc::now(),
        };
        self.repo.save_product(&product).await?;

        tracing::info!(product_id = %product.id, name = %product.name, "product added");
        self.feeds.products.publish(ChangeEvent::Inserted(product.clone()));
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_products(scope.restaurant_id).await?)
    }

    /// Change price and/or availability of a product.
    pub async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, AppError> {
        let scope = self.session.require_restaurant()?;
        update.validate()?;

        let mut product = self.owned_product(&scope, id).await?;
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(available) = update.is_available {
            product.is_available = available;
        }
        self.repo.update_product(&product).await?;

        tracing::info!(product_id = %id, price = product.price, available = product.is_available, "product updated");
        self.feeds.products.publish(ChangeEvent::Updated(product.clone()));
        Ok(product)
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<Product, AppError> {
        let scope = self.session.require_restaurant()?;
        let product = self.owned_product(&scope, id).await?;
        self.repo.delete_product(id).await?;

        tracing::info!(product_id = %id, "product deleted");
        self.feeds.products.publish(ChangeEvent::Deleted(product.clone()));
        Ok(product)
    }

    async fn owned_product(
        &self,
        scope: &RestaurantScope,
        id: ProductId,
    ) -> Result<Product, AppError> {
        owned(scope, self.repo.get_product(id).await?, || {
            AppError::ProductNotFound(id.to_string())
        })
    }

    // ========================
    // Modifiers
    // ========================

    pub async fn add_modifier(&self, request: ModifierRequest) -> Result<Modifier, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let modifier = Modifier {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: request.name.trim().to_string(),
            price: request.price,
            is_active: request.is_active,
            created_at: Utc::now(),
        };
        self.repo.save_modifier(&modifier).await?;

        tracing::info!(modifier_id = %modifier.id, name = %modifier.name, "modifier added");
        self.feeds.modifiers.publish(ChangeEvent::Inserted(modifier.clone()));
        Ok(modifier)
    }

    /// Alphabetical.
    pub async fn list_modifiers(&self) -> Result<Vec<Modifier>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_modifiers(scope.restaurant_id).await?)
    }

    pub async fn update_modifier(
        &self,
        id: ModifierId,
        request: ModifierRequest,
    ) -> Result<Modifier, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let mut modifier = owned(&scope, self.repo.get_modifier(id).await?, || {
            AppError::ModifierNotFound(id.to_string())
        })?;
        modifier.name = request.name.trim().to_string();
        modifier.price = request.price;
        modifier.is_active = request.is_active;
        self.repo.update_modifier(&modifier).await?;

        tracing::info!(modifier_id = %id, "modifier updated");
        self.feeds.modifiers.publish(ChangeEvent::Updated(modifier.clone()));
        Ok(modifier)
    }

    pub async fn delete_modifier(&self, id: ModifierId) -> Result<Modifier, AppError> {
        let scope = self.session.require_restaurant()?;
        let modifier = owned(&scope, self.repo.get_modifier(id).await?, || {
            AppError::ModifierNotFound(id.to_string())
        })?;
        self.repo.delete_modifier(id).await?;

        tracing::info!(modifier_id = %id, "modifier deleted");
        self.feeds.modifiers.publish(ChangeEvent::Deleted(modifier.clone()));
        Ok(modifier)
    }

    // ========================
    // Departments
    // ========================

    pub async fn add_department(&self, request: DepartmentRequest) -> Result<Department, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let department = Department {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: request.name,
            description: request.description,
            created_at: Utc::now(),
        };
        self.repo.save_department(&department).await?;

        tracing::info!(department_id = %department.id, name = %department.name, "department added");
        self.feeds.departments.publish(ChangeEvent::Inserted(department.clone()));
        Ok(department)
    }

    /// Newest first.
    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_departments(scope.restaurant_id).await?)
    }

    pub async fn update_department(
        &self,
        id: DepartmentId,
        request: DepartmentRequest,
    ) -> Result<Department, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let mut department = self.owned_department(&scope, id).await?;
        department.name = request.name;
        department.description = request.description;
        self.repo.update_department(&department).await?;

        tracing::info!(department_id = %id, "department updated");
        self.feeds.departments.publish(ChangeEvent::Updated(department.clone()));
        Ok(department)
    }

    pub async fn delete_department(&self, id: DepartmentId) -> Result<Department, AppError> {
        let scope = self.session.require_restaurant()?;
        let department = self.owned_department(&scope, id).await?;
        self.repo.delete_department(id).await?;

        tracing::info!(department_id = %id, "department deleted");
        self.feeds.departments.publish(ChangeEvent::Deleted(department.clone()));
        Ok(department)
    }

    async fn owned_department(
        &self,
        scope: &RestaurantScope,
        id: DepartmentId,
    ) -> Result<Department, AppError> {
        owned(scope, self.repo.get_department(id).await?, || {
            AppError::DepartmentNotFound(id.to_string())
        })
    }

    // ========================
    // Staff accounts
    // ========================

    /// Create a till operator. Usernames are unique within the restaurant.
    pub async fn add_staff_user(&self, request: StaffUserRequest) -> Result<StaffUser, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        if let Some(branch_id) = request.branch_id {
            self.owned_branch(&scope, branch_id).await?;
        }

        let taken = self
            .repo
            .list_staff_users(scope.restaurant_id)
            .await?
            .iter()
            .any(|u| u.username == request.username);
        if taken {
            return Err(AppError::UsernameTaken(request.username));
        }

        let user = StaffUser {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            branch_id: request.branch_id,
            username: request.username,
            full_name: request.full_name.trim().to_string(),
            role: request.role,
            password_hash: hash_password(&request.password)?,
            is_active: true,
            created_at: Utc::now(),
        };
        self.repo.save_staff_user(&user).await?;

        tracing::info!(staff_id = %user.id, username = %user.username, role = %user.role, "staff user added");
        self.feeds.staff.publish(ChangeEvent::Inserted(user.clone()));
        Ok(user)
    }

    pub async fn list_staff_users(&self) -> Result<Vec<StaffUser>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_staff_users(scope.restaurant_id).await?)
    }

    pub async fn update_staff_user(
        &self,
        id: StaffUserId,
        update: StaffUserUpdate,
    ) -> Result<StaffUser, AppError> {
        let scope = self.session.require_restaurant()?;
        update.validate()?;
        if let Some(branch_id) = update.branch_id {
            self.owned_branch(&scope, branch_id).await?;
        }

        let mut user = self.owned_staff_user(&scope, id).await?;
        user.full_name = update.full_name.trim().to_string();
        user.role = update.role;
        user.branch_id = update.branch_id;
        user.is_active = update.is_active;
        if let Some(password) = &update.password {
            user.password_hash = hash_password(password)?;
        }
        self.repo.update_staff_user(&user).await?;

        tracing::info!(staff_id = %id, password_changed = update.password.is_some(), "staff user updated");
        self.feeds.staff.publish(ChangeEvent::Updated(user.clone()));
        Ok(user)
    }

    pub async fn delete_staff_user(&self, id: StaffUserId) -> Result<StaffUser, AppError> {
        let scope = self.session.require_restaurant()?;
        let user = self.owned_staff_user(&scope, id).await?;
        self.repo.delete_staff_user(id).await?;

        tracing::info!(staff_id = %id, "staff user deleted");
        self.feeds.staff.publish(ChangeEvent::Deleted(user.clone()));
        Ok(user)
    }

    /// Check a till operator's credentials. Inactive accounts never match.
    pub async fn verify_staff_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<StaffUser, AppError> {
        let scope = self.session.require_restaurant()?;
        self.repo
            .list_staff_users(scope.restaurant_id)
            .await?
            .into_iter()
            .find(|u| {
                u.username == username && u.is_active && verify_password(password, &u.password_hash)
            })
            .ok_or(AppError::InvalidCredentials)
    }

    async fn owned_staff_user(
        &self,
        scope: &RestaurantScope,
        id: StaffUserId,
    ) -> Result<StaffUser, AppError> {
        owned(scope, self.repo.get_staff_user(id).await?, || {
            AppError::StaffUserNotFound(id.to_string())
        })
    }

    // ========================
    // Stock: ingredients, semi-finished items, warehouses
    // ========================

    pub async fn add_ingredient(&self, request: IngredientRequest) -> Result<Ingredient, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let ingredient = Ingredient {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: request.name.trim().to_string(),
            unit: request.unit,
            quantity: request.quantity,
            min_quantity: request.min_quantity,
            is_active: request.is_active,
            created_at: Utc::now(),
        };
        self.repo.save_ingredient(&ingredient).await?;

        tracing::info!(ingredient_id = %ingredient.id, name = %ingredient.name, "ingredient added");
        self.feeds.ingredients.publish(ChangeEvent::Inserted(ingredient.clone()));
        Ok(ingredient)
    }

    /// Alphabetical.
    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_ingredients(scope.restaurant_id).await?)
    }

    pub async fn update_ingredient(
        &self,
        id: IngredientId,
        request: IngredientRequest,
    ) -> Result<Ingredient, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;

        let mut ingredient = self.owned_ingredient(&scope, id).await?;
        ingredient.name = request.name.trim().to_string();
        ingredient.unit = request.unit;
        ingredient.quantity = request.quantity;
        ingredient.min_quantity = request.min_quantity;
        ingredient.is_active = request.is_active;
        self.repo.update_ingredient(&ingredient).await?;

        tracing::info!(ingredient_id = %id, quantity = ingredient.quantity, "ingredient updated");
        self.feeds.ingredients.publish(ChangeEvent::Updated(ingredient.clone()));
        Ok(ingredient)
    }

    /// Ingredients still listed in a semi-finished recipe cannot be deleted.
    pub async fn delete_ingredient(&self, id: IngredientId) -> Result<Ingredient, AppError> {
        let scope = self.session.require_restaurant()?;
        let ingredient = self.owned_ingredient(&scope, id).await?;

        let recipe = self
            .repo
            .list_semi_finished(scope.restaurant_id)
            .await?
            .into_iter()
            .find(|item| item.uses(id));
        if let Some(item) = recipe {
            return Err(AppError::IngredientInUse(item.name));
        }

        self.repo.delete_ingredient(id).await?;
        tracing::info!(ingredient_id = %id, "ingredient deleted");
        self.feeds.ingredients.publish(ChangeEvent::Deleted(ingredient.clone()));
        Ok(ingredient)
    }

    /// Active ingredients at or below their reorder threshold.
    pub async fn low_stock_ingredients(&self) -> Result<Vec<Ingredient>, AppError> {
        let ingredients = self.list_ingredients().await?;
        Ok(low_stock(&ingredients, |i| i.is_active)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn owned_ingredient(
        &self,
        scope: &RestaurantScope,
        id: IngredientId,
    ) -> Result<Ingredient, AppError> {
        owned(scope, self.repo.get_ingredient(id).await?, || {
            AppError::IngredientNotFound(id.to_string())
        })
    }

    /// Every recipe line must name an ingredient of the restaurant.
    pub async fn add_semi_finished(
        &self,
        request: SemiFinishedRequest,
    ) -> Result<SemiFinished, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        for line in &request.ingredients {
            self.owned_ingredient(&scope, line.ingredient_id).await?;
        }

        let item = SemiFinished {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: request.name.trim().to_string(),
            unit: request.unit,
            quantity: request.quantity,
            min_quantity: request.min_quantity,
            ingredients: request.ingredients,
            is_active: request.is_active,
            created_at: Utc::now(),
        };
        self.repo.save_semi_finished(&item).await?;

        tracing::info!(semi_finished_id = %item.id, name = %item.name, lines = item.ingredients.len(), "semi-finished item added");
        self.feeds.semi_finished.publish(ChangeEvent::Inserted(item.clone()));
        Ok(item)
    }

    /// Alphabetical.
    pub async fn list_semi_finished(&self) -> Result<Vec<SemiFinished>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_semi_finished(scope.restaurant_id).await?)
    }

    pub async fn update_semi_finished(
        &self,
        id: SemiFinishedId,
        request: SemiFinishedRequest,
    ) -> Result<SemiFinished, AppError> {
        let scope = self.session.require_restaurant()?;
        request.validate()?;
        for line in &request.ingredients {
            self.owned_ingredient(&scope, line.ingredient_id).await?;
        }

        let mut item = self.owned_semi_finished(&scope, id).await?;
        item.name = request.name.trim().to_string();
        item.unit = request.unit;
        item.quantity = request.quantity;
        item.min_quantity = request.min_quantity;
        item.ingredients = request.ingredients;
        item.is_active = request.is_active;
        self.repo.update_semi_finished(&item).await?;

        tracing::info!(semi_finished_id = %id, "semi-finished item updated");
        self.feeds.semi_finished.publish(ChangeEvent::Updated(item.clone()));
        Ok(item)
    }

    pub async fn delete_semi_finished(&self, id: SemiFinishedId) -> Result<SemiFinished, AppError> {
        let scope = self.session.require_restaurant()?;
        let item = self.owned_semi_finished(&scope, id).await?;
        self.repo.delete_semi_finished(id).await?;

        tracing::info!(semi_finished_id = %id, "semi-finished item deleted");
        self.feeds.semi_finished.publish(ChangeEvent::Deleted(item.clone()));
        Ok(item)
    }

    /// Active semi-finished items at or below their reorder threshold.
    pub async fn low_stock_semi_finished(&self) -> Result<Vec<SemiFinished>, AppError> {
        let items = self.list_semi_finished().await?;
        Ok(low_stock(&items, |i| i.is_active)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn owned_semi_finished(
        &self,
        scope: &RestaurantScope,
        id: SemiFinishedId,
    ) -> Result<SemiFinished, AppError> {
        owned(scope, self.repo.get_semi_finished(id).await?, || {
            AppError::SemiFinishedNotFound(id.to_string())
        })
    }

    /// New warehouses start active.
    pub async fn add_warehouse(&self, name: &str) -> Result<Warehouse, AppError> {
        let scope = self.session.require_restaurant()?;
        require_name("name", name)?;

        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            restaurant_id: scope.restaurant_id,
            name: name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.repo.save_warehouse(&warehouse).await?;

        tracing::info!(warehouse_id = %warehouse.id, name = %warehouse.name, "warehouse added");
        self.feeds.warehouses.publish(ChangeEvent::Inserted(warehouse.clone()));
        Ok(warehouse)
    }

    /// Newest first.
    pub async fn list_warehouses(&self) -> Result<Vec<Warehouse>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_warehouses(scope.restaurant_id).await?)
    }

    pub async fn set_warehouse_active(
        &self,
        id: WarehouseId,
        active: bool,
    ) -> Result<Warehouse, AppError> {
        let scope = self.session.require_restaurant()?;
        let mut warehouse = self.owned_warehouse(&scope, id).await?;
        self.repo.set_warehouse_active(id, active).await?;
        warehouse.is_active = active;

        tracing::info!(warehouse_id = %id, active, "warehouse activation changed");
        self.feeds.warehouses.publish(ChangeEvent::Updated(warehouse.clone()));
        Ok(warehouse)
    }

    pub async fn delete_warehouse(&self, id: WarehouseId) -> Result<Warehouse, AppError> {
        let scope = self.session.require_restaurant()?;
        let warehouse = self.owned_warehouse(&scope, id).await?;
        self.repo.delete_warehouse(id).await?;

        tracing::info!(warehouse_id = %id, "warehouse deleted");
        self.feeds.warehouses.publish(ChangeEvent::Deleted(warehouse.clone()));
        Ok(warehouse)
    }

    async fn owned_warehouse(
        &self,
        scope: &RestaurantScope,
        id: WarehouseId,
    ) -> Result<Warehouse, AppError> {
        owned(scope, self.repo.get_warehouse(id).await?, || {
            AppError::WarehouseNotFound(id.to_string())
        })
    }

    // ========================
    // Completed orders
    // ========================

    /// Record a paid order for the logged-in restaurant.
    pub async fn record_order(&self, builder: OrderBuilder) -> Result<CompletedOrder, AppError> {
        let scope = self.session.require_restaurant()?;
        let order = builder.build(scope.restaurant_id);

        if self.repo.order_exists(scope.restaurant_id, &order.id).await? {
            return Err(AppError::OrderAlreadyExists(order.id));
        }
        self.repo.save_order(&order).await?;

        tracing::info!(order_id = %order.id, table = order.table_number, total = order.total, "order recorded");
        self.feeds.orders.publish(ChangeEvent::Inserted(order.clone()));
        Ok(order)
    }

    /// Import a JSON array of completed orders into the logged-in restaurant.
    ///
    /// The payload is checked as a whole before anything is written, and the
    /// new rows are stored in one transaction. Orders whose id the restaurant
    /// already has, or that repeat an earlier id of the same payload, are
    /// skipped. Returns how many were added.
    pub async fn import_orders(&self, json: &str) -> Result<usize, AppError> {
        let scope = self.session.require_restaurant()?;
        let orders: Vec<CompletedOrder> = serde_json::from_str(json)?;

        if orders.iter().any(|o| o.id.trim().is_empty()) {
            return Err(ValidationError::new("id", "order id must not be empty").into());
        }

        let mut seen = HashSet::new();
        let mut fresh = Vec::with_capacity(orders.len());
        for mut order in orders {
            if !seen.insert(order.id.clone()) {
                tracing::debug!(order_id = %order.id, "skipping repeated order in payload");
                continue;
            }
            if self.repo.order_exists(scope.restaurant_id, &order.id).await? {
                tracing::debug!(order_id = %order.id, "skipping already imported order");
                continue;
            }
            order.restaurant_id = scope.restaurant_id;
            fresh.push(order);
        }

        self.repo.save_orders(&fresh).await?;

        let imported = fresh.len();
        tracing::info!(imported, "orders imported");
        for order in fresh {
            self.feeds.orders.publish(ChangeEvent::Inserted(order));
        }
        Ok(imported)
    }

    /// Orders of the logged-in restaurant, newest first.
    pub async fn list_orders(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<CompletedOrder>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self.repo.list_orders(scope.restaurant_id, range).await?)
    }

    // ========================
    // Statistics
    // ========================

    /// Statistics of the logged-in restaurant for the period containing now.
    pub async fn statistics_report(&self, period: Period) -> Result<StatisticsReport, AppError> {
        self.statistics_report_at(period, &Local::now()).await
    }

    /// Statistics for the period containing `now`, bucketed in `now`'s time zone.
    pub async fn statistics_report_at<Tz: TimeZone>(
        &self,
        period: Period,
        now: &DateTime<Tz>,
    ) -> Result<StatisticsReport, AppError>
    where
        Tz::Offset: Display,
    {
        let scope = self.session.require_restaurant()?;
        let range = period.range_at(now);
        let orders = self.repo.list_orders(scope.restaurant_id, Some(range)).await?;
        let tables = self.repo.list_tables(scope.restaurant_id).await?;

        tracing::debug!(%period, orders = orders.len(), "building statistics report");
        Ok(build_statistics_report(
            period,
            range,
            scope.currency,
            &orders,
            &tables,
            &now.timezone(),
        ))
    }

    /// Revenue of every restaurant for the period containing now.
    pub async fn admin_overview(&self, period: Period) -> Result<AdminOverview, AppError> {
        self.admin_overview_at(period, &Local::now()).await
    }

    /// Per-restaurant totals, highest revenue first.
    pub async fn admin_overview_at<Tz: TimeZone>(
        &self,
        period: Period,
        now: &DateTime<Tz>,
    ) -> Result<AdminOverview, AppError> {
        self.session.require_admin()?;
        let range = period.range_at(now);
        let sums = self.repo.sum_orders_by_restaurant(range).await?;

        let mut restaurants: Vec<RestaurantOverview> = self
            .repo
            .list_restaurants()
            .await?
            .into_iter()
            .map(|r| {
                let (total_revenue, count) = sums.get(&r.id).copied().unwrap_or((0, 0));
                RestaurantOverview {
                    restaurant_id: r.id,
                    name: r.name,
                    currency: r.currency,
                    is_active: r.is_active,
                    totals: PeriodTotals {
                        total_revenue,
                        order_count: usize::try_from(count).unwrap_or(0),
                    },
                }
            })
            .collect();
        restaurants.sort_by(|a, b| b.totals.total_revenue.cmp(&a.totals.total_revenue));

        Ok(AdminOverview {
            period,
            range,
            total_revenue: restaurants
                .iter()
                .fold(0, |sum: i64, r| sum.saturating_add(r.totals.total_revenue)),
            order_count: restaurants.iter().map(|r| r.totals.order_count).sum(),
            restaurants,
        })
    }

    // ========================
    // Live updates
    // ========================

    /// Orders of the logged-in restaurant as they are recorded.
    pub fn subscribe_orders(&self) -> Result<Subscription<CompletedOrder>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self
            .feeds
            .orders
            .subscribe(RowFilter::Restaurant(scope.restaurant_id)))
    }

    /// Table changes of the logged-in restaurant.
    pub fn subscribe_tables(&self) -> Result<Subscription<DiningTable>, AppError> {
        let scope = self.session.require_restaurant()?;
        Ok(self
            .feeds
            .tables
            .subscribe(RowFilter::Restaurant(scope.restaurant_id)))
    }

    /// Every order change across restaurants.
    pub fn subscribe_all_orders(&self) -> Result<Subscription<CompletedOrder>, AppError> {
        self.session.require_admin()?;
        Ok(self.feeds.orders.subscribe(RowFilter::All))
    }
}
