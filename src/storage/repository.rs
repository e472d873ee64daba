use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    AdminUser, Branch, BranchId, Category, CategoryId, Cents, CompletedOrder, DateRange,
    Department, DepartmentId, DiningTable, Hall, HallId, Ingredient, IngredientId, Modifier,
    ModifierId, PaymentMethod, Product, ProductId, RecipeLine, Restaurant, RestaurantId,
    SemiFinished, SemiFinishedId, StaffRole, StaffUser, StaffUserId, SubCategory, SubCategoryId,
    TableId, TableStatus, Unit, Warehouse, WarehouseId, line_items_from_value,
};

use super::MIGRATION_001_INITIAL;

const ORDER_COLUMNS: &str = "id, restaurant_id, table_number, items, subtotal_cents, discount_cents, tax_cents, total_cents, payment_method, completed_at, completed_by";
const RESTAURANT_COLUMNS: &str = "id, name, username, password_hash, currency, email, phone, address, is_active, created_at";
const PRODUCT_COLUMNS: &str = "id, restaurant_id, category_id, sub_category_id, name, price_cents, description, barcode, is_available, created_at";
const STAFF_COLUMNS: &str = "id, restaurant_id, branch_id, username, full_name, role, password_hash, is_active, created_at";
const INGREDIENT_COLUMNS: &str = "id, restaurant_id, name, unit, quantity, min_quantity, is_active, created_at";
const SEMI_FINISHED_COLUMNS: &str = "id, restaurant_id, name, unit, quantity, min_quantity, ingredients, is_active, created_at";

/// Stored timestamps are fixed-width RFC 3339 in UTC so that string
/// comparison in SQL follows time order.
fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(value: &str, column: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid {column} timestamp"))?
        .with_timezone(&Utc))
}

fn parse_id(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid {what} ID"))
}

fn parse_optional_id(value: Option<String>, what: &str) -> Result<Option<Uuid>> {
    value.map(|v| parse_id(&v, what)).transpose()
}

fn parse_unit(value: &str) -> Result<Unit> {
    value.parse().map_err(|e: String| anyhow::anyhow!(e))
}

async fn insert_order<'e, E>(executor: E, order: &CompletedOrder) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let items_json = serde_json::to_string(&order.items)?;

    sqlx::query(&format!(
        "INSERT INTO completed_orders ({ORDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&order.id)
    .bind(order.restaurant_id.to_string())
    .bind(order.table_number)
    .bind(&items_json)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.payment_method.as_str())
    .bind(ts(&order.completed_at))
    .bind(&order.completed_by)
    .execute(executor)
    .await
    .with_context(|| format!("Failed to save order {}", order.id))?;
    Ok(())
}

/// Repository standing in for the hosted tables: every query that reads
/// tenant data is filtered on `restaurant_id`.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        tracing::debug!("schema migrated");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Admin accounts
    // ========================

    pub async fn save_admin(&self, admin: &AdminUser) -> Result<()> {
        sqlx::query(
            "INSERT INTO admin_users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(admin.id.to_string())
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(ts(&admin.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save admin")?;
        Ok(())
    }

    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM admin_users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch admin")?;

        row.map(|row| {
            let id: String = row.get("id");
            let created_at: String = row.get("created_at");
            Ok(AdminUser {
                id: parse_id(&id, "admin")?,
                username: row.get("username"),
                password_hash: row.get("password_hash"),
                created_at: parse_ts(&created_at, "created_at")?,
            })
        })
        .transpose()
    }

    // ========================
    // Restaurants
    // ========================

    pub async fn save_restaurant(&self, restaurant: &Restaurant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO restaurants (id, name, username, password_hash, currency, email, phone, address, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(restaurant.id.to_string())
        .bind(&restaurant.name)
        .bind(&restaurant.username)
        .bind(&restaurant.password_hash)
        .bind(&restaurant.currency)
        .bind(&restaurant.email)
        .bind(&restaurant.phone)
        .bind(&restaurant.address)
        .bind(restaurant.is_active)
        .bind(ts(&restaurant.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save restaurant")?;
        Ok(())
    }

    pub async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        let row = sqlx::query(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch restaurant")?;

        row.as_ref().map(Self::row_to_restaurant).transpose()
    }

    pub async fn get_restaurant_by_username(&self, username: &str) -> Result<Option<Restaurant>> {
        let row = sqlx::query(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch restaurant by username")?;

        row.as_ref().map(Self::row_to_restaurant).transpose()
    }

    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list restaurants")?;

        rows.iter().map(Self::row_to_restaurant).collect()
    }

    pub async fn set_restaurant_active(&self, id: RestaurantId, active: bool) -> Result<()> {
        sqlx::query("UPDATE restaurants SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update restaurant")?;
        Ok(())
    }

    /// Delete a restaurant together with every row it owns.
    pub async fn delete_restaurant(&self, id: RestaurantId) -> Result<()> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for table in [
            "completed_orders",
            "semi_finished",
            "ingredients",
            "warehouses",
            "modifiers",
            "products",
            "sub_categories",
            "categories",
            "departments",
            "staff_users",
            "dining_tables",
            "halls",
            "branches",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE restaurant_id = ?"))
                .bind(&id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete {table} of restaurant"))?;
        }

        sqlx::query("DELETE FROM restaurants WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete restaurant")?;

        tx.commit().await.context("Failed to commit restaurant delete")?;
        Ok(())
    }

    fn row_to_restaurant(row: &SqliteRow) -> Result<Restaurant> {
        let id: String = row.get("id");
        let created_at: String = row.get("created_at");

        Ok(Restaurant {
            id: parse_id(&id, "restaurant")?,
            name: row.get("name"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            currency: row.get("currency"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Branches
    // ========================

    pub async fn save_branch(&self, branch: &Branch) -> Result<()> {
        sqlx::query(
            "INSERT INTO branches (id, restaurant_id, name, address, phone, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(branch.id.to_string())
        .bind(branch.restaurant_id.to_string())
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.phone)
        .bind(ts(&branch.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save branch")?;
        Ok(())
    }

    pub async fn update_branch(&self, branch: &Branch) -> Result<()> {
        sqlx::query("UPDATE branches SET name = ?, address = ?, phone = ? WHERE id = ?")
            .bind(&branch.name)
            .bind(&branch.address)
            .bind(&branch.phone)
            .bind(branch.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update branch")?;
        Ok(())
    }

    pub async fn get_branch(&self, id: BranchId) -> Result<Option<Branch>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, address, phone, created_at FROM branches WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch branch")?;

        row.as_ref().map(Self::row_to_branch).transpose()
    }

    pub async fn list_branches(&self, restaurant_id: RestaurantId) -> Result<Vec<Branch>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, address, phone, created_at FROM branches WHERE restaurant_id = ? ORDER BY name",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list branches")?;

        rows.iter().map(Self::row_to_branch).collect()
    }

    /// Staff assigned to the branch stay, without a branch.
    pub async fn delete_branch(&self, id: BranchId) -> Result<()> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("UPDATE staff_users SET branch_id = NULL WHERE branch_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach staff from branch")?;
        sqlx::query("UPDATE halls SET branch_id = NULL WHERE branch_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach halls from branch")?;
        sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete branch")?;

        tx.commit().await.context("Failed to commit branch delete")?;
        Ok(())
    }

    fn row_to_branch(row: &SqliteRow) -> Result<Branch> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let created_at: String = row.get("created_at");

        Ok(Branch {
            id: parse_id(&id, "branch")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            address: row.get("address"),
            phone: row.get("phone"),
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Halls
    // ========================

    pub async fn save_hall(&self, hall: &Hall) -> Result<()> {
        sqlx::query(
            "INSERT INTO halls (id, restaurant_id, branch_id, name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(hall.id.to_string())
        .bind(hall.restaurant_id.to_string())
        .bind(hall.branch_id.map(|id| id.to_string()))
        .bind(&hall.name)
        .bind(ts(&hall.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save hall")?;
        Ok(())
    }

    pub async fn update_hall(&self, hall: &Hall) -> Result<()> {
        sqlx::query("UPDATE halls SET name = ?, branch_id = ? WHERE id = ?")
            .bind(&hall.name)
            .bind(hall.branch_id.map(|id| id.to_string()))
            .bind(hall.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update hall")?;
        Ok(())
    }

    pub async fn get_hall(&self, id: HallId) -> Result<Option<Hall>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, branch_id, name, created_at FROM halls WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch hall")?;

        row.as_ref().map(Self::row_to_hall).transpose()
    }

    /// Newest first.
    pub async fn list_halls(&self, restaurant_id: RestaurantId) -> Result<Vec<Hall>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, branch_id, name, created_at FROM halls WHERE restaurant_id = ? ORDER BY created_at DESC",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list halls")?;

        rows.iter().map(Self::row_to_hall).collect()
    }

    /// Tables in the hall stay, detached from it.
    pub async fn delete_hall(&self, id: HallId) -> Result<()> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("UPDATE dining_tables SET hall_id = NULL WHERE hall_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach tables from hall")?;
        sqlx::query("DELETE FROM halls WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete hall")?;

        tx.commit().await.context("Failed to commit hall delete")?;
        Ok(())
    }

    fn row_to_hall(row: &SqliteRow) -> Result<Hall> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let created_at: String = row.get("created_at");

        Ok(Hall {
            id: parse_id(&id, "hall")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            branch_id: parse_optional_id(row.get("branch_id"), "branch")?,
            name: row.get("name"),
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Dining tables
    // ========================

    pub async fn save_table(&self, table: &DiningTable) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dining_tables (id, restaurant_id, hall_id, number, seats, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(table.id.to_string())
        .bind(table.restaurant_id.to_string())
        .bind(table.hall_id.map(|id| id.to_string()))
        .bind(table.number)
        .bind(i64::from(table.seats))
        .bind(table.status.as_str())
        .bind(ts(&table.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save table")?;
        Ok(())
    }

    pub async fn get_table(&self, id: TableId) -> Result<Option<DiningTable>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, hall_id, number, seats, status, created_at FROM dining_tables WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch table")?;

        row.as_ref().map(Self::row_to_table).transpose()
    }

    pub async fn list_tables(&self, restaurant_id: RestaurantId) -> Result<Vec<DiningTable>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, hall_id, number, seats, status, created_at FROM dining_tables WHERE restaurant_id = ? ORDER BY number",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tables")?;

        rows.iter().map(Self::row_to_table).collect()
    }

    pub async fn update_table_status(&self, id: TableId, status: TableStatus) -> Result<()> {
        sqlx::query("UPDATE dining_tables SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update table status")?;
        Ok(())
    }

    pub async fn delete_table(&self, id: TableId) -> Result<()> {
        sqlx::query("DELETE FROM dining_tables WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete table")?;
        Ok(())
    }

    fn row_to_table(row: &SqliteRow) -> Result<DiningTable> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let status: String = row.get("status");
        let seats: i64 = row.get("seats");
        let created_at: String = row.get("created_at");

        Ok(DiningTable {
            id: parse_id(&id, "table")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            hall_id: parse_optional_id(row.get("hall_id"), "hall")?,
            number: row.get("number"),
            seats: u32::try_from(seats).context("Invalid seat count")?,
            status: status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Categories
    // ========================

    pub async fn save_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, restaurant_id, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(category.id.to_string())
        .bind(category.restaurant_id.to_string())
        .bind(&category.name)
        .bind(ts(&category.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save category")?;
        Ok(())
    }

    pub async fn rename_category(&self, id: CategoryId, name: &str) -> Result<()> {
        sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to rename category")?;
        Ok(())
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, created_at FROM categories WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    pub async fn list_categories(&self, restaurant_id: RestaurantId) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, created_at FROM categories WHERE restaurant_id = ? ORDER BY name",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter().map(Self::row_to_category).collect()
    }

    /// Delete a category with its sub-categories and the products filed under it.
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM products WHERE category_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete category products")?;
        sqlx::query("DELETE FROM sub_categories WHERE category_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete sub-categories")?;
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete category")?;

        tx.commit().await.context("Failed to commit category delete")?;
        Ok(())
    }

    fn row_to_category(row: &SqliteRow) -> Result<Category> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let created_at: String = row.get("created_at");

        Ok(Category {
            id: parse_id(&id, "category")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Sub-categories
    // ========================

    pub async fn save_sub_category(&self, sub_category: &SubCategory) -> Result<()> {
        sqlx::query(
            "INSERT INTO sub_categories (id, restaurant_id, category_id, name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(sub_category.id.to_string())
        .bind(sub_category.restaurant_id.to_string())
        .bind(sub_category.category_id.to_string())
        .bind(&sub_category.name)
        .bind(ts(&sub_category.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save sub-category")?;
        Ok(())
    }

    pub async fn rename_sub_category(&self, id: SubCategoryId, name: &str) -> Result<()> {
        sqlx::query("UPDATE sub_categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to rename sub-category")?;
        Ok(())
    }

    pub async fn get_sub_category(&self, id: SubCategoryId) -> Result<Option<SubCategory>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, category_id, name, created_at FROM sub_categories WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch sub-category")?;

        row.as_ref().map(Self::row_to_sub_category).transpose()
    }

    /// Sub-categories of one restaurant, optionally narrowed to one category.
    pub async fn list_sub_categories(
        &self,
        restaurant_id: RestaurantId,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<SubCategory>> {
        let mut query = String::from(
            "SELECT id, restaurant_id, category_id, name, created_at FROM sub_categories WHERE restaurant_id = ?",
        );
        if category_id.is_some() {
            query.push_str(" AND category_id = ?");
        }
        query.push_str(" ORDER BY name");

        let mut sql_query = sqlx::query(&query).bind(restaurant_id.to_string());
        if let Some(category_id) = category_id {
            sql_query = sql_query.bind(category_id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list sub-categories")?;

        rows.iter().map(Self::row_to_sub_category).collect()
    }

    /// Products filed under the sub-category stay in its parent category.
    pub async fn delete_sub_category(&self, id: SubCategoryId) -> Result<()> {
        let id = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("UPDATE products SET sub_category_id = NULL WHERE sub_category_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach products from sub-category")?;
        sqlx::query("DELETE FROM sub_categories WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete sub-category")?;

        tx.commit().await.context("Failed to commit sub-category delete")?;
        Ok(())
    }

    fn row_to_sub_category(row: &SqliteRow) -> Result<SubCategory> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let category_id: String = row.get("category_id");
        let created_at: String = row.get("created_at");

        Ok(SubCategory {
            id: parse_id(&id, "sub-category")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            category_id: parse_id(&category_id, "category")?,
            name: row.get("name"),
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Products
    // ========================

    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(product.id.to_string())
        .bind(product.restaurant_id.to_string())
        .bind(product.category_id.to_string())
        .bind(product.sub_category_id.map(|id| id.to_string()))
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.barcode)
        .bind(product.is_available)
        .bind(ts(&product.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save product")?;
        Ok(())
    }

    pub async fn update_product(&self, product: &Product) -> Result<()> {
        sqlx::query("UPDATE products SET price_cents = ?, is_available = ? WHERE id = ?")
            .bind(product.price)
            .bind(product.is_available)
            .bind(product.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update product")?;
        Ok(())
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product")?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    pub async fn list_products(&self, restaurant_id: RestaurantId) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE restaurant_id = ? ORDER BY name"
        ))
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete product")?;
        Ok(())
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let category_id: String = row.get("category_id");
        let created_at: String = row.get("created_at");

        Ok(Product {
            id: parse_id(&id, "product")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            category_id: parse_id(&category_id, "category")?,
            sub_category_id: parse_optional_id(row.get("sub_category_id"), "sub-category")?,
            name: row.get("name"),
            price: row.get("price_cents"),
            description: row.get("description"),
            barcode: row.get("barcode"),
            is_available: row.get::<i32, _>("is_available") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Modifiers
    // ========================

    pub async fn save_modifier(&self, modifier: &Modifier) -> Result<()> {
        sqlx::query(
            "INSERT INTO modifiers (id, restaurant_id, name, price_cents, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(modifier.id.to_string())
        .bind(modifier.restaurant_id.to_string())
        .bind(&modifier.name)
        .bind(modifier.price)
        .bind(modifier.is_active)
        .bind(ts(&modifier.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save modifier")?;
        Ok(())
    }

    pub async fn update_modifier(&self, modifier: &Modifier) -> Result<()> {
        sqlx::query("UPDATE modifiers SET name = ?, price_cents = ?, is_active = ? WHERE id = ?")
            .bind(&modifier.name)
            .bind(modifier.price)
            .bind(modifier.is_active)
            .bind(modifier.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update modifier")?;
        Ok(())
    }

    pub async fn get_modifier(&self, id: ModifierId) -> Result<Option<Modifier>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, price_cents, is_active, created_at FROM modifiers WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch modifier")?;

        row.as_ref().map(Self::row_to_modifier).transpose()
    }

    pub async fn list_modifiers(&self, restaurant_id: RestaurantId) -> Result<Vec<Modifier>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, price_cents, is_active, created_at FROM modifiers WHERE restaurant_id = ? ORDER BY name",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list modifiers")?;

        rows.iter().map(Self::row_to_modifier).collect()
    }

    pub async fn delete_modifier(&self, id: ModifierId) -> Result<()> {
        sqlx::query("DELETE FROM modifiers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete modifier")?;
        Ok(())
    }

    fn row_to_modifier(row: &SqliteRow) -> Result<Modifier> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let created_at: String = row.get("created_at");

        Ok(Modifier {
            id: parse_id(&id, "modifier")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            price: row.get("price_cents"),
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Departments
    // ========================

    pub async fn save_department(&self, department: &Department) -> Result<()> {
        sqlx::query(
            "INSERT INTO departments (id, restaurant_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(department.id.to_string())
        .bind(department.restaurant_id.to_string())
        .bind(&department.name)
        .bind(&department.description)
        .bind(ts(&department.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save department")?;
        Ok(())
    }

    pub async fn update_department(&self, department: &Department) -> Result<()> {
        sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
            .bind(&department.name)
            .bind(&department.description)
            .bind(department.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update department")?;
        Ok(())
    }

    pub async fn get_department(&self, id: DepartmentId) -> Result<Option<Department>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, description, created_at FROM departments WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch department")?;

        row.as_ref().map(Self::row_to_department).transpose()
    }

    /// Newest first.
    pub async fn list_departments(&self, restaurant_id: RestaurantId) -> Result<Vec<Department>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, description, created_at FROM departments WHERE restaurant_id = ? ORDER BY created_at DESC",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list departments")?;

        rows.iter().map(Self::row_to_department).collect()
    }

    pub async fn delete_department(&self, id: DepartmentId) -> Result<()> {
        sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete department")?;
        Ok(())
    }

    fn row_to_department(row: &SqliteRow) -> Result<Department> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let created_at: String = row.get("created_at");

        Ok(Department {
            id: parse_id(&id, "department")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            description: row.get("description"),
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Staff accounts
    // ========================

    pub async fn save_staff_user(&self, user: &StaffUser) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO staff_users ({STAFF_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(user.id.to_string())
        .bind(user.restaurant_id.to_string())
        .bind(user.branch_id.map(|id| id.to_string()))
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(ts(&user.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save staff user")?;
        Ok(())
    }

    pub async fn update_staff_user(&self, user: &StaffUser) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE staff_users
            SET branch_id = ?, full_name = ?, role = ?, password_hash = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(user.branch_id.map(|id| id.to_string()))
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update staff user")?;
        Ok(())
    }

    pub async fn get_staff_user(&self, id: StaffUserId) -> Result<Option<StaffUser>> {
        let row = sqlx::query(&format!("SELECT {STAFF_COLUMNS} FROM staff_users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch staff user")?;

        row.as_ref().map(Self::row_to_staff_user).transpose()
    }

    pub async fn list_staff_users(&self, restaurant_id: RestaurantId) -> Result<Vec<StaffUser>> {
        let rows = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff_users WHERE restaurant_id = ? ORDER BY username"
        ))
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list staff users")?;

        rows.iter().map(Self::row_to_staff_user).collect()
    }

    pub async fn delete_staff_user(&self, id: StaffUserId) -> Result<()> {
        sqlx::query("DELETE FROM staff_users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete staff user")?;
        Ok(())
    }

    fn row_to_staff_user(row: &SqliteRow) -> Result<StaffUser> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let role: String = row.get("role");
        let created_at: String = row.get("created_at");

        Ok(StaffUser {
            id: parse_id(&id, "staff user")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            branch_id: parse_optional_id(row.get("branch_id"), "branch")?,
            username: row.get("username"),
            full_name: row.get("full_name"),
            role: role.parse::<StaffRole>().map_err(|e| anyhow::anyhow!(e))?,
            password_hash: row.get("password_hash"),
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Ingredients
    // ========================

    pub async fn save_ingredient(&self, ingredient: &Ingredient) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO ingredients ({INGREDIENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(ingredient.id.to_string())
        .bind(ingredient.restaurant_id.to_string())
        .bind(&ingredient.name)
        .bind(ingredient.unit.as_str())
        .bind(ingredient.quantity)
        .bind(ingredient.min_quantity)
        .bind(ingredient.is_active)
        .bind(ts(&ingredient.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save ingredient")?;
        Ok(())
    }

    pub async fn update_ingredient(&self, ingredient: &Ingredient) -> Result<()> {
        sqlx::query(
            "UPDATE ingredients SET name = ?, unit = ?, quantity = ?, min_quantity = ?, is_active = ? WHERE id = ?",
        )
        .bind(&ingredient.name)
        .bind(ingredient.unit.as_str())
        .bind(ingredient.quantity)
        .bind(ingredient.min_quantity)
        .bind(ingredient.is_active)
        .bind(ingredient.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update ingredient")?;
        Ok(())
    }

    pub async fn get_ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>> {
        let row = sqlx::query(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch ingredient")?;

        row.as_ref().map(Self::row_to_ingredient).transpose()
    }

    pub async fn list_ingredients(&self, restaurant_id: RestaurantId) -> Result<Vec<Ingredient>> {
        let rows = sqlx::query(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE restaurant_id = ? ORDER BY name"
        ))
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ingredients")?;

        rows.iter().map(Self::row_to_ingredient).collect()
    }

    pub async fn delete_ingredient(&self, id: IngredientId) -> Result<()> {
        sqlx::query("DELETE FROM ingredients WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete ingredient")?;
        Ok(())
    }

    fn row_to_ingredient(row: &SqliteRow) -> Result<Ingredient> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let unit: String = row.get("unit");
        let created_at: String = row.get("created_at");

        Ok(Ingredient {
            id: parse_id(&id, "ingredient")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            unit: parse_unit(&unit)?,
            quantity: row.get("quantity"),
            min_quantity: row.get("min_quantity"),
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Semi-finished items
    // ========================

    pub async fn save_semi_finished(&self, item: &SemiFinished) -> Result<()> {
        let ingredients_json = serde_json::to_string(&item.ingredients)?;

        sqlx::query(&format!(
            "INSERT INTO semi_finished ({SEMI_FINISHED_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(item.id.to_string())
        .bind(item.restaurant_id.to_string())
        .bind(&item.name)
        .bind(item.unit.as_str())
        .bind(item.quantity)
        .bind(item.min_quantity)
        .bind(&ingredients_json)
        .bind(item.is_active)
        .bind(ts(&item.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save semi-finished item")?;
        Ok(())
    }

    pub async fn update_semi_finished(&self, item: &SemiFinished) -> Result<()> {
        let ingredients_json = serde_json::to_string(&item.ingredients)?;

        sqlx::query(
            r#"
            UPDATE semi_finished
            SET name = ?, unit = ?, quantity = ?, min_quantity = ?, ingredients = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&item.name)
        .bind(item.unit.as_str())
        .bind(item.quantity)
        .bind(item.min_quantity)
        .bind(&ingredients_json)
        .bind(item.is_active)
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update semi-finished item")?;
        Ok(())
    }

    pub async fn get_semi_finished(&self, id: SemiFinishedId) -> Result<Option<SemiFinished>> {
        let row = sqlx::query(&format!(
            "SELECT {SEMI_FINISHED_COLUMNS} FROM semi_finished WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch semi-finished item")?;

        row.as_ref().map(Self::row_to_semi_finished).transpose()
    }

    pub async fn list_semi_finished(&self, restaurant_id: RestaurantId) -> Result<Vec<SemiFinished>> {
        let rows = sqlx::query(&format!(
            "SELECT {SEMI_FINISHED_COLUMNS} FROM semi_finished WHERE restaurant_id = ? ORDER BY name"
        ))
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list semi-finished items")?;

        rows.iter().map(Self::row_to_semi_finished).collect()
    }

    pub async fn delete_semi_finished(&self, id: SemiFinishedId) -> Result<()> {
        sqlx::query("DELETE FROM semi_finished WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete semi-finished item")?;
        Ok(())
    }

    fn row_to_semi_finished(row: &SqliteRow) -> Result<SemiFinished> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let unit: String = row.get("unit");
        let ingredients_json: String = row.get("ingredients");
        let created_at: String = row.get("created_at");

        let ingredients: Vec<RecipeLine> =
            serde_json::from_str(&ingredients_json).context("Invalid recipe lines")?;

        Ok(SemiFinished {
            id: parse_id(&id, "semi-finished item")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            unit: parse_unit(&unit)?,
            quantity: row.get("quantity"),
            min_quantity: row.get("min_quantity"),
            ingredients,
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Warehouses
    // ========================

    pub async fn save_warehouse(&self, warehouse: &Warehouse) -> Result<()> {
        sqlx::query(
            "INSERT INTO warehouses (id, restaurant_id, name, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(warehouse.id.to_string())
        .bind(warehouse.restaurant_id.to_string())
        .bind(&warehouse.name)
        .bind(warehouse.is_active)
        .bind(ts(&warehouse.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save warehouse")?;
        Ok(())
    }

    pub async fn set_warehouse_active(&self, id: WarehouseId, active: bool) -> Result<()> {
        sqlx::query("UPDATE warehouses SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update warehouse")?;
        Ok(())
    }

    pub async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, is_active, created_at FROM warehouses WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch warehouse")?;

        row.as_ref().map(Self::row_to_warehouse).transpose()
    }

    /// Newest first.
    pub async fn list_warehouses(&self, restaurant_id: RestaurantId) -> Result<Vec<Warehouse>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, is_active, created_at FROM warehouses WHERE restaurant_id = ? ORDER BY created_at DESC",
        )
        .bind(restaurant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list warehouses")?;

        rows.iter().map(Self::row_to_warehouse).collect()
    }

    pub async fn delete_warehouse(&self, id: WarehouseId) -> Result<()> {
        sqlx::query("DELETE FROM warehouses WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete warehouse")?;
        Ok(())
    }

    fn row_to_warehouse(row: &SqliteRow) -> Result<Warehouse> {
        let id: String = row.get("id");
        let restaurant_id: String = row.get("restaurant_id");
        let created_at: String = row.get("created_at");

        Ok(Warehouse {
            id: parse_id(&id, "warehouse")?,
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            name: row.get("name"),
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_ts(&created_at, "created_at")?,
        })
    }

    // ========================
    // Completed orders
    // ========================

    pub async fn save_order(&self, order: &CompletedOrder) -> Result<()> {
        insert_order(&self.pool, order).await
    }

    /// Insert a batch of orders in one transaction: either every row lands or none does.
    pub async fn save_orders(&self, orders: &[CompletedOrder]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        for order in orders {
            insert_order(&mut *tx, order).await?;
        }
        tx.commit().await.context("Failed to commit order import")?;
        tracing::debug!(rows = orders.len(), "saved order batch");
        Ok(())
    }

    /// Order ids are unique per restaurant, not across tenants.
    pub async fn order_exists(&self, restaurant_id: RestaurantId, id: &str) -> Result<bool> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) as count FROM completed_orders WHERE restaurant_id = ? AND id = ?",
        )
        .bind(restaurant_id.to_string())
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to look up order")?
        .get("count");
        Ok(count > 0)
    }

    /// Orders of one restaurant, newest first, optionally limited to an inclusive range.
    pub async fn list_orders(
        &self,
        restaurant_id: RestaurantId,
        range: Option<DateRange>,
    ) -> Result<Vec<CompletedOrder>> {
        let mut query = format!("SELECT {ORDER_COLUMNS} FROM completed_orders WHERE restaurant_id = ?");
        if range.is_some() {
            query.push_str(" AND completed_at >= ? AND completed_at <= ?");
        }
        query.push_str(" ORDER BY completed_at DESC");

        let mut sql_query = sqlx::query(&query).bind(restaurant_id.to_string());
        if let Some(range) = range {
            sql_query = sql_query.bind(ts(&range.start)).bind(ts(&range.end));
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list orders")?;
        tracing::debug!(%restaurant_id, rows = rows.len(), "loaded orders");

        rows.iter().map(Self::row_to_order).collect()
    }

    /// Revenue and order count per restaurant inside an inclusive range.
    /// Restaurants without orders are absent from the map.
    pub async fn sum_orders_by_restaurant(
        &self,
        range: DateRange,
    ) -> Result<HashMap<RestaurantId, (Cents, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT restaurant_id, COALESCE(SUM(total_cents), 0) as revenue, COUNT(*) as orders
            FROM completed_orders
            WHERE completed_at >= ? AND completed_at <= ?
            GROUP BY restaurant_id
            "#,
        )
        .bind(ts(&range.start))
        .bind(ts(&range.end))
        .fetch_all(&self.pool)
        .await
        .context("Failed to sum orders by restaurant")?;
        tracing::debug!(restaurants = rows.len(), "summed orders by restaurant");

        let mut totals = HashMap::new();
        for row in rows {
            let restaurant_id: String = row.get("restaurant_id");
            totals.insert(
                parse_id(&restaurant_id, "restaurant")?,
                (row.get("revenue"), row.get("orders")),
            );
        }
        Ok(totals)
    }

    fn row_to_order(row: &SqliteRow) -> Result<CompletedOrder> {
        let restaurant_id: String = row.get("restaurant_id");
        let items_json: String = row.get("items");
        let payment_method: String = row.get("payment_method");
        let completed_at: String = row.get("completed_at");

        let items = serde_json::from_str(&items_json)
            .map(|value| line_items_from_value(&value))
            .unwrap_or_default();

        Ok(CompletedOrder {
            id: row.get("id"),
            restaurant_id: parse_id(&restaurant_id, "restaurant")?,
            table_number: row.get("table_number"),
            items,
            subtotal: row.get("subtotal_cents"),
            discount: row.get("discount_cents"),
            tax: row.get("tax_cents"),
            total: row.get("total_cents"),
            payment_method: payment_method
                .parse::<PaymentMethod>()
                .map_err(|e| anyhow::anyhow!(e))?,
            completed_at: parse_ts(&completed_at, "completed_at")?,
            completed_by: row.get("completed_by"),
        })
    }
}
