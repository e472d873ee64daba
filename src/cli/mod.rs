use std::io::Read;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{AdminOverview, BackOfficeService, StatisticsReport};
use crate::domain::{
    BranchRequest, Cents, DEFAULT_CURRENCY, DateRange, DepartmentRequest, HallRequest,
    Ingredient, IngredientRequest, ModifierRequest, NewRestaurant, OrderBuilder, PaymentMethod,
    Period, ProductRequest, ProductUpdate, RecipeLine, SemiFinished, SemiFinishedRequest,
    StaffRole, StaffUserRequest, StaffUserUpdate, SubCategoryRequest, TableRequest, TableStatus,
    Unit, format_cents, format_currency, format_date, format_date_time, parse_cents,
};

/// Tabletop - restaurant back office
#[derive(Parser)]
#[command(name = "tabletop")]
#[command(about = "Back office for restaurants: menu, tables, completed orders and sales statistics")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "TABLETOP_DB", default_value = "tabletop.db", global = true)]
    pub database: String,

    /// Account to log in with (admin or restaurant)
    #[arg(short, long, env = "TABLETOP_USER", global = true)]
    pub user: Option<String>,

    /// Password of the account
    #[arg(long, env = "TABLETOP_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database, optionally with a first admin account
    Init {
        /// Admin username to create
        #[arg(long, requires = "admin_password")]
        admin: Option<String>,

        /// Admin password
        #[arg(long)]
        admin_password: Option<String>,
    },

    /// Check credentials and show who is logged in
    Login,

    /// Restaurant accounts (admin)
    #[command(subcommand)]
    Restaurant(RestaurantCommands),

    /// Branch management
    #[command(subcommand)]
    Branch(BranchCommands),

    /// Hall management
    #[command(subcommand)]
    Hall(HallCommands),

    /// Dining table management
    #[command(subcommand)]
    Table(TableCommands),

    /// Menu categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Sub-categories inside a menu category
    #[command(subcommand)]
    SubCategory(SubCategoryCommands),

    /// Menu products
    #[command(subcommand)]
    Product(ProductCommands),

    /// Paid extras that can be added to products
    #[command(subcommand)]
    Modifier(ModifierCommands),

    /// Kitchen and bar departments
    #[command(subcommand)]
    Department(DepartmentCommands),

    /// Till operators (cashiers, waiters, kitchen, managers)
    #[command(subcommand)]
    Staff(StaffCommands),

    /// Raw stock ingredients
    #[command(subcommand)]
    Ingredient(IngredientCommands),

    /// Preparations made from ingredients
    #[command(subcommand)]
    SemiFinished(SemiFinishedCommands),

    /// Storage locations
    #[command(subcommand)]
    Warehouse(WarehouseCommands),

    /// Completed orders
    #[command(subcommand)]
    Order(OrderCommands),

    /// Sales statistics of the logged-in restaurant
    Stats {
        /// Period: today, month, year
        #[arg(long, default_value = "today")]
        period: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Revenue of every restaurant (admin)
    Overview {
        /// Period: today, month, year
        #[arg(long, default_value = "today")]
        period: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum RestaurantCommands {
    /// Create a restaurant account
    Create {
        /// Restaurant name
        name: String,

        /// Login name of the restaurant
        #[arg(long)]
        account: String,

        /// Login password of the restaurant
        #[arg(long)]
        account_password: String,

        /// Currency code (AZN, USD, EUR, TRY)
        #[arg(long, default_value = DEFAULT_CURRENCY)]
        currency: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },

    /// List all restaurants
    List,

    /// Allow a restaurant to log in again
    Activate { id: Uuid },

    /// Block a restaurant from logging in
    Deactivate { id: Uuid },

    /// Delete a restaurant and all of its data
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum BranchCommands {
    /// Add a branch
    Add {
        name: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// List branches
    List,

    /// Replace name, address and phone of a branch
    Update {
        id: Uuid,
        name: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Delete a branch
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum HallCommands {
    /// Add a hall
    Add {
        name: String,
        /// Branch the hall belongs to
        #[arg(long)]
        branch: Option<Uuid>,
    },

    /// List halls
    List,

    /// Rename a hall or move it to another branch
    Update {
        id: Uuid,
        name: String,
        #[arg(long)]
        branch: Option<Uuid>,
    },

    /// Delete a hall; its tables are kept
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum TableCommands {
    /// Add a table
    Add {
        /// Table number, unique per restaurant
        number: i64,
        #[arg(long, default_value_t = 4)]
        seats: u32,
        #[arg(long)]
        hall: Option<Uuid>,
    },

    /// List tables
    List,

    /// Set the status of a table: available, occupied, reserved
    Status { number: i64, status: TableStatus },

    /// Delete a table
    Delete { number: i64 },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category
    Add { name: String },

    /// List categories
    List,

    /// Rename a category
    Rename { name: String, new_name: String },

    /// Delete a category with its sub-categories and products
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum SubCategoryCommands {
    /// Add a sub-category
    Add {
        name: String,

        /// Parent category name
        #[arg(long)]
        category: String,
    },

    /// List sub-categories, optionally of one category
    List {
        #[arg(long)]
        category: Option<String>,
    },

    /// Rename a sub-category
    Rename { id: Uuid, name: String },

    /// Delete a sub-category; its products stay in the category
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Add a product
    Add {
        name: String,

        /// Category name
        #[arg(long)]
        category: String,

        /// Sub-category name inside the category
        #[arg(long)]
        sub_category: Option<String>,

        /// Price (e.g., "4.50")
        #[arg(long)]
        price: String,

        #[arg(long)]
        description: Option<String>,

        /// Barcode (13 digits are generated when omitted)
        #[arg(long)]
        barcode: Option<String>,
    },

    /// List products
    List,

    /// Change price or availability
    Update {
        id: Uuid,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        available: Option<bool>,
    },

    /// Delete a product
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum DepartmentCommands {
    /// Add a department
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// List departments, newest first
    List,

    /// Replace name and description of a department
    Update {
        id: Uuid,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a department
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum ModifierCommands {
    /// Add a modifier
    Add {
        name: String,

        /// Extra price (e.g., "0.50"); free when omitted
        #[arg(long, default_value = "0")]
        price: String,

        /// Create it switched off
        #[arg(long)]
        inactive: bool,
    },

    /// List modifiers
    List,

    /// Replace name, price and activity of a modifier
    Update {
        id: Uuid,
        name: String,
        #[arg(long, default_value = "0")]
        price: String,
        #[arg(long)]
        inactive: bool,
    },

    /// Delete a modifier
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum StaffCommands {
    /// Create a staff account
    Add {
        username: String,

        /// Full name
        #[arg(long)]
        name: String,

        /// Login password of the staff member
        #[arg(long)]
        staff_password: String,

        /// Role: cashier, waiter, kitchen, manager
        #[arg(long, default_value = "cashier")]
        role: StaffRole,

        #[arg(long)]
        branch: Option<Uuid>,
    },

    /// List staff accounts
    List,

    /// Change a staff account; omitted fields keep their value
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<StaffRole>,
        #[arg(long)]
        branch: Option<Uuid>,
        /// Remove the branch assignment
        #[arg(long, conflicts_with = "branch")]
        no_branch: bool,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        new_password: Option<String>,
    },

    /// Delete a staff account
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum IngredientCommands {
    /// Add an ingredient
    Add {
        name: String,

        /// Unit: kg, g, l, ml, pcs, m
        #[arg(long)]
        unit: Unit,

        #[arg(long, default_value_t = 0.0)]
        quantity: f64,

        /// Reorder threshold
        #[arg(long, default_value_t = 0.0)]
        min: f64,
    },

    /// List ingredients
    List,

    /// Change stock levels; omitted fields keep their value
    Update {
        id: Uuid,
        #[arg(long)]
        quantity: Option<f64>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete an ingredient not used by any semi-finished item
    Delete { id: Uuid },

    /// Active ingredients at or below their threshold
    LowStock,
}

#[derive(Subcommand)]
pub enum SemiFinishedCommands {
    /// Add a semi-finished item
    Add {
        name: String,

        /// Unit: kg, g, l, ml, pcs, m
        #[arg(long)]
        unit: Unit,

        #[arg(long, default_value_t = 0.0)]
        quantity: f64,

        /// Reorder threshold
        #[arg(long, default_value_t = 0.0)]
        min: f64,

        /// Recipe line as INGREDIENT_ID:QUANTITY (repeatable)
        #[arg(long = "ingredient", required = true)]
        ingredients: Vec<String>,
    },

    /// List semi-finished items
    List,

    /// Delete a semi-finished item
    Delete { id: Uuid },

    /// Active items at or below their threshold
    LowStock,
}

#[derive(Subcommand)]
pub enum WarehouseCommands {
    /// Add a warehouse
    Add { name: String },

    /// List warehouses, newest first
    List,

    /// Mark a warehouse as in use
    Activate { id: Uuid },

    /// Mark a warehouse as out of use
    Deactivate { id: Uuid },

    /// Delete a warehouse
    Delete { id: Uuid },
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Record a paid order
    Record {
        /// Table number
        #[arg(long)]
        table: i64,

        /// Line item as NAME:PRICE:QUANTITY (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,

        /// Payment method: cash, card, online
        #[arg(long, default_value = "cash")]
        payment: PaymentMethod,

        /// Flat discount (e.g., "2.00")
        #[arg(long)]
        discount: Option<String>,

        /// Tax rate in percent
        #[arg(long, default_value_t = 0.0)]
        tax_rate: f64,

        /// Waiter who closed the order
        #[arg(long)]
        by: Option<String>,
    },

    /// Import a JSON array of completed orders
    Import {
        /// Input file (use "-" for stdin)
        input: String,
    },

    /// List orders, newest first
    List {
        /// Limit to a period: today, month, year
        #[arg(long)]
        period: Option<String>,
    },
}

impl Cli {
    /// Connect and log in with the global credentials.
    async fn open_session(&self) -> Result<BackOfficeService> {
        let user = self
            .user
            .as_deref()
            .context("No account given. Use --user or TABLETOP_USER")?;
        let password = self
            .password
            .as_deref()
            .context("No password given. Use --password or TABLETOP_PASSWORD")?;

        let service = BackOfficeService::connect(&self.database).await?;
        service.login(user, password).await?;
        Ok(service)
    }

    pub async fn run(self) -> Result<()> {
        if let Commands::Init {
            admin,
            admin_password,
        } = &self.command
        {
            let service = BackOfficeService::init(&self.database).await?;
            println!("Database initialized: {}", self.database);
            if let (Some(admin), Some(password)) = (admin, admin_password) {
                service.bootstrap_admin(admin, password).await?;
                println!("Created admin: {}", admin);
            }
            return Ok(());
        }

        let service = self.open_session().await?;

        match self.command {
            Commands::Init { .. } => {}

            Commands::Login => {
                if let Some(session) = service.session().current() {
                    let role = if session.is_admin() { "admin" } else { "restaurant" };
                    println!("Logged in as {} ({})", session.display_name(), role);
                }
            }

            Commands::Restaurant(cmd) => run_restaurant_command(&service, cmd).await?,
            Commands::Branch(cmd) => run_branch_command(&service, cmd).await?,
            Commands::Hall(cmd) => run_hall_command(&service, cmd).await?,
            Commands::Table(cmd) => run_table_command(&service, cmd).await?,
            Commands::Category(cmd) => run_category_command(&service, cmd).await?,
            Commands::SubCategory(cmd) => run_sub_category_command(&service, cmd).await?,
            Commands::Product(cmd) => run_product_command(&service, cmd).await?,
            Commands::Modifier(cmd) => run_modifier_command(&service, cmd).await?,
            Commands::Department(cmd) => run_department_command(&service, cmd).await?,
            Commands::Staff(cmd) => run_staff_command(&service, cmd).await?,
            Commands::Ingredient(cmd) => run_ingredient_command(&service, cmd).await?,
            Commands::SemiFinished(cmd) => run_semi_finished_command(&service, cmd).await?,
            Commands::Warehouse(cmd) => run_warehouse_command(&service, cmd).await?,
            Commands::Order(cmd) => run_order_command(&service, cmd).await?,

            Commands::Stats { period, format } => {
                let report = service.statistics_report(Period::from_token(&period)).await?;
                print_statistics(&report, &format)?;
            }

            Commands::Overview { period, format } => {
                let overview = service.admin_overview(Period::from_token(&period)).await?;
                print_overview(&overview, &format)?;
            }
        }

        Ok(())
    }
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'", input))
}

/// Parse `NAME:PRICE:QUANTITY`. The name may itself contain ':'.
fn parse_item(input: &str) -> Result<(String, Cents, u32)> {
    let mut parts = input.rsplitn(3, ':');
    let (Some(quantity), Some(price), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("Invalid item '{}'. Use NAME:PRICE:QUANTITY", input);
    };

    let quantity = quantity
        .trim()
        .parse()
        .with_context(|| format!("Invalid quantity in item '{}'", input))?;
    Ok((name.trim().to_string(), parse_amount(price)?, quantity))
}

/// Parse `INGREDIENT_ID:QUANTITY`.
fn parse_recipe_line(input: &str) -> Result<RecipeLine> {
    let (id, quantity) = input
        .split_once(':')
        .with_context(|| format!("Invalid ingredient '{}'. Use INGREDIENT_ID:QUANTITY", input))?;

    Ok(RecipeLine {
        ingredient_id: id
            .trim()
            .parse()
            .with_context(|| format!("Invalid ingredient id in '{}'", input))?,
        quantity: quantity
            .trim()
            .parse()
            .with_context(|| format!("Invalid quantity in '{}'", input))?,
    })
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

async fn run_restaurant_command(service: &BackOfficeService, cmd: RestaurantCommands) -> Result<()> {
    match cmd {
        RestaurantCommands::Create {
            name,
            account,
            account_password,
            currency,
            email,
            phone,
            address,
        } => {
            let restaurant = service
                .create_restaurant(NewRestaurant {
                    name,
                    username: account,
                    password: account_password,
                    currency: currency.to_uppercase(),
                    email,
                    phone,
                    address,
                })
                .await?;
            println!("Created restaurant: {} ({})", restaurant.name, restaurant.id);
        }

        RestaurantCommands::List => {
            let restaurants = service.list_restaurants().await?;
            if restaurants.is_empty() {
                println!("No restaurants found.");
                return Ok(());
            }

            println!(
                "{:<36}  {:<20} {:<14} {:<8} {:<8} {:<10}",
                "ID", "NAME", "ACCOUNT", "CURRENCY", "ACTIVE", "CREATED"
            );
            println!("{}", "-".repeat(102));
            let tz = Local;
            for r in restaurants {
                println!(
                    "{:<36}  {:<20} {:<14} {:<8} {:<8} {:<10}",
                    r.id,
                    r.name,
                    r.username,
                    r.currency,
                    if r.is_active { "yes" } else { "no" },
                    format_date(&r.created_at, &tz)
                );
            }
        }

        RestaurantCommands::Activate { id } => {
            let restaurant = service.set_restaurant_active(id, true).await?;
            println!("Activated restaurant: {}", restaurant.name);
        }

        RestaurantCommands::Deactivate { id } => {
            let restaurant = service.set_restaurant_active(id, false).await?;
            println!("Deactivated restaurant: {}", restaurant.name);
        }

        RestaurantCommands::Delete { id } => {
            let restaurant = service.delete_restaurant(id).await?;
            println!("Deleted restaurant: {}", restaurant.name);
        }
    }
    Ok(())
}

async fn run_branch_command(service: &BackOfficeService, cmd: BranchCommands) -> Result<()> {
    match cmd {
        BranchCommands::Add {
            name,
            address,
            phone,
        } => {
            let branch = service
                .add_branch(BranchRequest {
                    name,
                    address,
                    phone,
                })
                .await?;
            println!("Added branch: {} ({})", branch.name, branch.id);
        }

        BranchCommands::List => {
            let branches = service.list_branches().await?;
            if branches.is_empty() {
                println!("No branches found.");
                return Ok(());
            }

            println!("{:<36}  {:<20} {:<16} {}", "ID", "NAME", "PHONE", "ADDRESS");
            println!("{}", "-".repeat(90));
            for b in branches {
                println!(
                    "{:<36}  {:<20} {:<16} {}",
                    b.id,
                    b.name,
                    or_dash(b.phone.as_deref()),
                    or_dash(b.address.as_deref())
                );
            }
        }

        BranchCommands::Update {
            id,
            name,
            address,
            phone,
        } => {
            let branch = service
                .update_branch(
                    id,
                    BranchRequest {
                        name,
                        address,
                        phone,
                    },
                )
                .await?;
            println!("Updated branch: {}", branch.name);
        }

        BranchCommands::Delete { id } => {
            let branch = service.delete_branch(id).await?;
            println!("Deleted branch: {}", branch.name);
        }
    }
    Ok(())
}

async fn run_hall_command(service: &BackOfficeService, cmd: HallCommands) -> Result<()> {
    match cmd {
        HallCommands::Add { name, branch } => {
            let hall = service
                .add_hall(HallRequest {
                    name,
                    branch_id: branch,
                })
                .await?;
            println!("Added hall: {} ({})", hall.name, hall.id);
        }

        HallCommands::List => {
            let halls = service.list_halls().await?;
            if halls.is_empty() {
                println!("No halls found.");
                return Ok(());
            }

            println!("{:<36}  {:<20} {}", "ID", "NAME", "BRANCH");
            println!("{}", "-".repeat(96));
            for h in halls {
                let branch = h.branch_id.map(|id| id.to_string());
                println!("{:<36}  {:<20} {}", h.id, h.name, or_dash(branch.as_deref()));
            }
        }

        HallCommands::Update { id, name, branch } => {
            let hall = service
                .update_hall(
                    id,
                    HallRequest {
                        name,
                        branch_id: branch,
                    },
                )
                .await?;
            println!("Updated hall: {}", hall.name);
        }

        HallCommands::Delete { id } => {
            let hall = service.delete_hall(id).await?;
            println!("Deleted hall: {}", hall.name);
        }
    }
    Ok(())
}

async fn run_table_command(service: &BackOfficeService, cmd: TableCommands) -> Result<()> {
    match cmd {
        TableCommands::Add {
            number,
            seats,
            hall,
        } => {
            let table = service
                .add_table(TableRequest {
                    number,
                    seats,
                    hall_id: hall,
                })
                .await?;
            println!("Added table {} ({} seats)", table.number, table.seats);
        }

        TableCommands::List => {
            let tables = service.list_tables().await?;
            if tables.is_empty() {
                println!("No tables found.");
                return Ok(());
            }

            println!("{:<8} {:<6} {:<8}", "TABLE", "SEATS", "STATUS");
            println!("{}", "-".repeat(24));
            for t in &tables {
                println!(
                    "{:<8} {:<6} {:<8}",
                    t.number,
                    t.seats,
                    t.status.display_name()
                );
            }
            println!();
            println!(
                "Occupied: {} of {}",
                crate::domain::active_table_count(&tables),
                tables.len()
            );
        }

        TableCommands::Status { number, status } => {
            let table = service.find_table_by_number(number).await?;
            let table = service.update_table_status(table.id, status).await?;
            println!("Table {} is now {}", table.number, table.status.display_name());
        }

        TableCommands::Delete { number } => {
            let table = service.find_table_by_number(number).await?;
            service.delete_table(table.id).await?;
            println!("Deleted table {}", number);
        }
    }
    Ok(())
}

async fn run_category_command(service: &BackOfficeService, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Add { name } => {
            let category = service.add_category(&name).await?;
            println!("Added category: {}", category.name);
        }

        CategoryCommands::List => {
            let categories = service.list_categories().await?;
            if categories.is_empty() {
                println!("No categories found.");
                return Ok(());
            }
            for c in categories {
                println!("{}", c.name);
            }
        }

        CategoryCommands::Rename { name, new_name } => {
            let category = find_category(service, &name).await?;
            let category = service.update_category(category.id, &new_name).await?;
            println!("Renamed category: {} -> {}", name, category.name);
        }

        CategoryCommands::Delete { name } => {
            let category = find_category(service, &name).await?;
            service.delete_category(category.id).await?;
            println!("Deleted category: {}", category.name);
        }
    }
    Ok(())
}

async fn find_category(
    service: &BackOfficeService,
    name: &str,
) -> Result<crate::domain::Category> {
    let lowered = name.to_lowercase();
    service
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.name.to_lowercase() == lowered)
        .with_context(|| format!("Category not found: {}", name))
}

async fn run_sub_category_command(
    service: &BackOfficeService,
    cmd: SubCategoryCommands,
) -> Result<()> {
    match cmd {
        SubCategoryCommands::Add { name, category } => {
            let category = find_category(service, &category).await?;
            let sub_category = service
                .add_sub_category(SubCategoryRequest {
                    name,
                    category_id: category.id,
                })
                .await?;
            println!(
                "Added sub-category: {} / {} ({})",
                category.name, sub_category.name, sub_category.id
            );
        }

        SubCategoryCommands::List { category } => {
            let category_id = match category {
                Some(name) => Some(find_category(service, &name).await?.id),
                None => None,
            };
            let sub_categories = service.list_sub_categories(category_id).await?;
            if sub_categories.is_empty() {
                println!("No sub-categories found.");
                return Ok(());
            }

            let categories = service.list_categories().await?;
            println!("{:<36}  {:<20} {}", "ID", "NAME", "CATEGORY");
            println!("{}", "-".repeat(76));
            for s in sub_categories {
                let category = categories
                    .iter()
                    .find(|c| c.id == s.category_id)
                    .map(|c| c.name.as_str());
                println!("{:<36}  {:<20} {}", s.id, s.name, or_dash(category));
            }
        }

        SubCategoryCommands::Rename { id, name } => {
            let sub_category = service.update_sub_category(id, &name).await?;
            println!("Renamed sub-category: {}", sub_category.name);
        }

        SubCategoryCommands::Delete { id } => {
            let sub_category = service.delete_sub_category(id).await?;
            println!("Deleted sub-category: {}", sub_category.name);
        }
    }
    Ok(())
}

async fn run_product_command(service: &BackOfficeService, cmd: ProductCommands) -> Result<()> {
    match cmd {
        ProductCommands::Add {
            name,
            category,
            sub_category,
            price,
            description,
            barcode,
        } => {
            let category = find_category(service, &category).await?;
            let sub_category_id = match sub_category {
                Some(name) => {
                    let lowered = name.to_lowercase();
                    let found = service
                        .list_sub_categories(Some(category.id))
                        .await?
                        .into_iter()
                        .find(|s| s.name.to_lowercase() == lowered)
                        .with_context(|| format!("Sub-category not found: {}", name))?;
                    Some(found.id)
                }
                None => None,
            };
            let product = service
                .add_product(ProductRequest {
                    name,
                    category_id: category.id,
                    sub_category_id,
                    price: parse_amount(&price)?,
                    description,
                    barcode,
                })
                .await?;
            println!(
                "Added product: {} {} [{}]",
                product.name,
                format_cents(product.price),
                product.barcode
            );
        }

        ProductCommands::List => {
            let products = service.list_products().await?;
            if products.is_empty() {
                println!("No products found.");
                return Ok(());
            }

            let categories = service.list_categories().await?;
            println!(
                "{:<36}  {:<20} {:<16} {:>10} {:<14} {:<9}",
                "ID", "NAME", "CATEGORY", "PRICE", "BARCODE", "AVAILABLE"
            );
            println!("{}", "-".repeat(110));
            for p in products {
                let category = categories
                    .iter()
                    .find(|c| c.id == p.category_id)
                    .map(|c| c.name.as_str());
                println!(
                    "{:<36}  {:<20} {:<16} {:>10} {:<14} {:<9}",
                    p.id,
                    p.name,
                    or_dash(category),
                    format_cents(p.price),
                    p.barcode,
                    if p.is_available { "yes" } else { "no" }
                );
            }
        }

        ProductCommands::Update {
            id,
            price,
            available,
        } => {
            let price = price.as_deref().map(parse_amount).transpose()?;
            let product = service
                .update_product(
                    id,
                    ProductUpdate {
                        price,
                        is_available: available,
                    },
                )
                .await?;
            println!(
                "Updated product: {} {} ({})",
                product.name,
                format_cents(product.price),
                if product.is_available { "available" } else { "unavailable" }
            );
        }

        ProductCommands::Delete { id } => {
            let product = service.delete_product(id).await?;
            println!("Deleted product: {}", product.name);
        }
    }
    Ok(())
}

async fn run_department_command(
    service: &BackOfficeService,
    cmd: DepartmentCommands,
) -> Result<()> {
    match cmd {
        DepartmentCommands::Add { name, description } => {
            let department = service
                .add_department(DepartmentRequest { name, description })
                .await?;
            println!("Added department: {} ({})", department.name, department.id);
        }

        DepartmentCommands::List => {
            let departments = service.list_departments().await?;
            if departments.is_empty() {
                println!("No departments found.");
                return Ok(());
            }

            let tz = Local;
            println!("{:<36}  {:<20} {:<10} {}", "ID", "NAME", "CREATED", "DESCRIPTION");
            println!("{}", "-".repeat(90));
            for d in departments {
                println!(
                    "{:<36}  {:<20} {:<10} {}",
                    d.id,
                    d.name,
                    format_date(&d.created_at, &tz),
                    or_dash(d.description.as_deref())
                );
            }
        }

        DepartmentCommands::Update {
            id,
            name,
            description,
        } => {
            let department = service
                .update_department(id, DepartmentRequest { name, description })
                .await?;
            println!("Updated department: {}", department.name);
        }

        DepartmentCommands::Delete { id } => {
            let department = service.delete_department(id).await?;
            println!("Deleted department: {}", department.name);
        }
    }
    Ok(())
}

async fn run_modifier_command(service: &BackOfficeService, cmd: ModifierCommands) -> Result<()> {
    match cmd {
        ModifierCommands::Add {
            name,
            price,
            inactive,
        } => {
            let modifier = service
                .add_modifier(ModifierRequest {
                    name,
                    price: parse_amount(&price)?,
                    is_active: !inactive,
                })
                .await?;
            println!(
                "Added modifier: {} +{} ({})",
                modifier.name,
                format_cents(modifier.price),
                modifier.id
            );
        }

        ModifierCommands::List => {
            let modifiers = service.list_modifiers().await?;
            if modifiers.is_empty() {
                println!("No modifiers found.");
                return Ok(());
            }

            println!("{:<36}  {:<20} {:>10} {:<6}", "ID", "NAME", "PRICE", "ACTIVE");
            println!("{}", "-".repeat(76));
            for m in modifiers {
                println!(
                    "{:<36}  {:<20} {:>10} {:<6}",
                    m.id,
                    m.name,
                    format_cents(m.price),
                    yes_no(m.is_active)
                );
            }
        }

        ModifierCommands::Update {
            id,
            name,
            price,
            inactive,
        } => {
            let modifier = service
                .update_modifier(
                    id,
                    ModifierRequest {
                        name,
                        price: parse_amount(&price)?,
                        is_active: !inactive,
                    },
                )
                .await?;
            println!("Updated modifier: {}", modifier.name);
        }

        ModifierCommands::Delete { id } => {
            let modifier = service.delete_modifier(id).await?;
            println!("Deleted modifier: {}", modifier.name);
        }
    }
    Ok(())
}

async fn run_staff_command(service: &BackOfficeService, cmd: StaffCommands) -> Result<()> {
    match cmd {
        StaffCommands::Add {
            username,
            name,
            staff_password,
            role,
            branch,
        } => {
            let user = service
                .add_staff_user(StaffUserRequest {
                    username,
                    full_name: name,
                    password: staff_password,
                    role,
                    branch_id: branch,
                })
                .await?;
            println!(
                "Added {}: {} ({})",
                user.role.display_name(),
                user.username,
                user.id
            );
        }

        StaffCommands::List => {
            let users = service.list_staff_users().await?;
            if users.is_empty() {
                println!("No staff accounts found.");
                return Ok(());
            }

            println!(
                "{:<36}  {:<14} {:<20} {:<10} {:<6}",
                "ID", "USERNAME", "NAME", "ROLE", "ACTIVE"
            );
            println!("{}", "-".repeat(90));
            for u in users {
                println!(
                    "{:<36}  {:<14} {:<20} {:<10} {:<6}",
                    u.id,
                    u.username,
                    u.full_name,
                    u.role.display_name(),
                    yes_no(u.is_active)
                );
            }
        }

        StaffCommands::Update {
            id,
            name,
            role,
            branch,
            no_branch,
            active,
            new_password,
        } => {
            let current = service
                .list_staff_users()
                .await?
                .into_iter()
                .find(|u| u.id == id)
                .with_context(|| format!("Staff account not found: {}", id))?;
            let branch_id = if no_branch {
                None
            } else {
                branch.or(current.branch_id)
            };

            let user = service
                .update_staff_user(
                    id,
                    StaffUserUpdate {
                        full_name: name.unwrap_or(current.full_name),
                        role: role.unwrap_or(current.role),
                        branch_id,
                        is_active: active.unwrap_or(current.is_active),
                        password: new_password,
                    },
                )
                .await?;
            println!("Updated staff account: {}", user.username);
        }

        StaffCommands::Delete { id } => {
            let user = service.delete_staff_user(id).await?;
            println!("Deleted staff account: {}", user.username);
        }
    }
    Ok(())
}

fn print_stock_header() {
    println!(
        "{:<36}  {:<20} {:>10} {:>10} {:<5} {:<6}",
        "ID", "NAME", "QTY", "MIN", "UNIT", "ACTIVE"
    );
    println!("{}", "-".repeat(94));
}

fn print_ingredients(ingredients: &[Ingredient]) {
    if ingredients.is_empty() {
        println!("No ingredients found.");
        return;
    }
    print_stock_header();
    for i in ingredients {
        println!(
            "{:<36}  {:<20} {:>10} {:>10} {:<5} {:<6}",
            i.id,
            i.name,
            i.quantity,
            i.min_quantity,
            i.unit.as_str(),
            yes_no(i.is_active)
        );
    }
}

fn print_semi_finished(items: &[SemiFinished]) {
    if items.is_empty() {
        println!("No semi-finished items found.");
        return;
    }
    print_stock_header();
    for i in items {
        println!(
            "{:<36}  {:<20} {:>10} {:>10} {:<5} {:<6}",
            i.id,
            i.name,
            i.quantity,
            i.min_quantity,
            i.unit.as_str(),
            yes_no(i.is_active)
        );
    }
}

async fn run_ingredient_command(service: &BackOfficeService, cmd: IngredientCommands) -> Result<()> {
    match cmd {
        IngredientCommands::Add {
            name,
            unit,
            quantity,
            min,
        } => {
            let ingredient = service
                .add_ingredient(IngredientRequest {
                    name,
                    unit,
                    quantity,
                    min_quantity: min,
                    is_active: true,
                })
                .await?;
            println!(
                "Added ingredient: {} {} {} ({})",
                ingredient.name, ingredient.quantity, ingredient.unit, ingredient.id
            );
        }

        IngredientCommands::List => {
            print_ingredients(&service.list_ingredients().await?);
        }

        IngredientCommands::LowStock => {
            print_ingredients(&service.low_stock_ingredients().await?);
        }

        IngredientCommands::Update {
            id,
            quantity,
            min,
            active,
        } => {
            let current = service
                .list_ingredients()
                .await?
                .into_iter()
                .find(|i| i.id == id)
                .with_context(|| format!("Ingredient not found: {}", id))?;

            let ingredient = service
                .update_ingredient(
                    id,
                    IngredientRequest {
                        name: current.name,
                        unit: current.unit,
                        quantity: quantity.unwrap_or(current.quantity),
                        min_quantity: min.unwrap_or(current.min_quantity),
                        is_active: active.unwrap_or(current.is_active),
                    },
                )
                .await?;
            println!(
                "Updated ingredient: {} {} {}",
                ingredient.name, ingredient.quantity, ingredient.unit
            );
        }

        IngredientCommands::Delete { id } => {
            let ingredient = service.delete_ingredient(id).await?;
            println!("Deleted ingredient: {}", ingredient.name);
        }
    }
    Ok(())
}

async fn run_semi_finished_command(
    service: &BackOfficeService,
    cmd: SemiFinishedCommands,
) -> Result<()> {
    match cmd {
        SemiFinishedCommands::Add {
            name,
            unit,
            quantity,
            min,
            ingredients,
        } => {
            let ingredients = ingredients
                .iter()
                .map(|line| parse_recipe_line(line))
                .collect::<Result<Vec<_>>>()?;
            let item = service
                .add_semi_finished(SemiFinishedRequest {
                    name,
                    unit,
                    quantity,
                    min_quantity: min,
                    ingredients,
                    is_active: true,
                })
                .await?;
            println!(
                "Added semi-finished item: {} ({} ingredients)",
                item.name,
                item.ingredients.len()
            );
        }

        SemiFinishedCommands::List => {
            print_semi_finished(&service.list_semi_finished().await?);
        }

        SemiFinishedCommands::LowStock => {
            print_semi_finished(&service.low_stock_semi_finished().await?);
        }

        SemiFinishedCommands::Delete { id } => {
            let item = service.delete_semi_finished(id).await?;
            println!("Deleted semi-finished item: {}", item.name);
        }
    }
    Ok(())
}

async fn run_warehouse_command(service: &BackOfficeService, cmd: WarehouseCommands) -> Result<()> {
    match cmd {
        WarehouseCommands::Add { name } => {
            let warehouse = service.add_warehouse(&name).await?;
            println!("Added warehouse: {} ({})", warehouse.name, warehouse.id);
        }

        WarehouseCommands::List => {
            let warehouses = service.list_warehouses().await?;
            if warehouses.is_empty() {
                println!("No warehouses found.");
                return Ok(());
            }

            let tz = Local;
            println!("{:<36}  {:<20} {:<6} {:<10}", "ID", "NAME", "ACTIVE", "CREATED");
            println!("{}", "-".repeat(76));
            for w in warehouses {
                println!(
                    "{:<36}  {:<20} {:<6} {:<10}",
                    w.id,
                    w.name,
                    yes_no(w.is_active),
                    format_date(&w.created_at, &tz)
                );
            }
        }

        WarehouseCommands::Activate { id } => {
            let warehouse = service.set_warehouse_active(id, true).await?;
            println!("Activated warehouse: {}", warehouse.name);
        }

        WarehouseCommands::Deactivate { id } => {
            let warehouse = service.set_warehouse_active(id, false).await?;
            println!("Deactivated warehouse: {}", warehouse.name);
        }

        WarehouseCommands::Delete { id } => {
            let warehouse = service.delete_warehouse(id).await?;
            println!("Deleted warehouse: {}", warehouse.name);
        }
    }
    Ok(())
}

async fn run_order_command(service: &BackOfficeService, cmd: OrderCommands) -> Result<()> {
    match cmd {
        OrderCommands::Record {
            table,
            items,
            payment,
            discount,
            tax_rate,
            by,
        } => {
            let mut builder = OrderBuilder::new(table, payment).with_tax_rate(tax_rate);
            for item in &items {
                let (name, price, quantity) = parse_item(item)?;
                builder = builder.item(name, price, quantity);
            }
            if let Some(discount) = discount {
                builder = builder.with_discount(parse_amount(&discount)?);
            }
            if let Some(by) = by {
                builder = builder.completed_by(by);
            }

            let order = service.record_order(builder).await?;
            println!(
                "Recorded order {} for table {}: {} ({})",
                order.id,
                order.table_number,
                format_cents(order.total),
                order.payment_method.display_name()
            );
        }

        OrderCommands::Import { input } => {
            let json = if input == "-" {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read stdin")?;
                buffer
            } else {
                std::fs::read_to_string(&input)
                    .with_context(|| format!("Failed to open input file: {}", input))?
            };

            let imported = service.import_orders(&json).await?;
            println!("Imported {} orders", imported);
        }

        OrderCommands::List { period } => {
            let range: Option<DateRange> =
                period.map(|p| Period::from_token(&p).current_range());
            let orders = service.list_orders(range).await?;
            if orders.is_empty() {
                println!("No orders found.");
                return Ok(());
            }

            let tz = Local;
            println!(
                "{:<17} {:<6} {:>6} {:>10} {:<8} {}",
                "COMPLETED", "TABLE", "ITEMS", "TOTAL", "PAYMENT", "BY"
            );
            println!("{}", "-".repeat(64));
            for o in orders {
                let quantity: u64 = o.items.iter().map(|i| u64::from(i.quantity)).sum();
                println!(
                    "{:<17} {:<6} {:>6} {:>10} {:<8} {}",
                    format_date_time(&o.completed_at, &tz),
                    o.table_number,
                    quantity,
                    format_cents(o.total),
                    o.payment_method.display_name(),
                    or_dash(o.completed_by.as_deref())
                );
            }
        }
    }
    Ok(())
}

fn print_statistics(report: &StatisticsReport, format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        "csv" => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["section", "key", "count", "revenue", "average"])?;
            for bucket in &report.revenue {
                writer.write_record([
                    "revenue",
                    bucket.bucket.as_str(),
                    "",
                    format_cents(bucket.revenue).as_str(),
                    "",
                ])?;
            }
            for product in &report.top_products {
                writer.write_record([
                    "product",
                    product.name.as_str(),
                    product.quantity.to_string().as_str(),
                    format_cents(product.revenue).as_str(),
                    "",
                ])?;
            }
            for table in &report.tables {
                writer.write_record([
                    "table",
                    table.table_number.to_string().as_str(),
                    table.order_count.to_string().as_str(),
                    format_cents(table.total_revenue).as_str(),
                    format_cents(table.average_check).as_str(),
                ])?;
            }
            writer.flush()?;
        }
        _ => {
            let tz = Local;
            let money = |cents| format_currency(cents, &report.currency);

            println!("Statistics: {}", report.period);
            println!(
                "Period: {} to {}",
                format_date(&report.range.start, &tz),
                format_date(&report.range.end, &tz)
            );
            println!();
            println!("Total revenue:  {:>15}", money(report.totals.total_revenue));
            println!("Orders:         {:>15}", report.totals.order_count);

            println!();
            println!("Revenue by {}:", report.granularity);
            if report.revenue.is_empty() {
                println!("  (no sales)");
            }
            for bucket in &report.revenue {
                println!("  {:<12} {:>15}", bucket.bucket, money(bucket.revenue));
            }

            println!();
            println!("Top products:");
            println!("  {:<24} {:>8} {:>15}", "PRODUCT", "QTY", "REVENUE");
            for product in &report.top_products {
                println!(
                    "  {:<24} {:>8} {:>15}",
                    product.name,
                    product.quantity,
                    money(product.revenue)
                );
            }

            println!();
            println!("Tables:");
            println!(
                "  {:<8} {:>8} {:>15} {:>15}",
                "TABLE", "ORDERS", "REVENUE", "AVG CHECK"
            );
            for table in &report.tables {
                println!(
                    "  {:<8} {:>8} {:>15} {:>15}",
                    table.table_number,
                    table.order_count,
                    money(table.total_revenue),
                    money(table.average_check)
                );
            }
        }
    }
    Ok(())
}

fn print_overview(overview: &AdminOverview, format: &str) -> Result<()> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(overview)?);
        }
        "csv" => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["restaurant", "currency", "active", "orders", "revenue"])?;
            for r in &overview.restaurants {
                writer.write_record([
                    r.name.as_str(),
                    r.currency.as_str(),
                    if r.is_active { "yes" } else { "no" },
                    r.totals.order_count.to_string().as_str(),
                    format_cents(r.totals.total_revenue).as_str(),
                ])?;
            }
            writer.flush()?;
        }
        _ => {
            let tz = Local;
            println!("Overview: {}", overview.period);
            println!(
                "Period: {} to {}",
                format_date(&overview.range.start, &tz),
                format_date(&overview.range.end, &tz)
            );
            println!();
            println!(
                "{:<24} {:<8} {:>8} {:>15}",
                "RESTAURANT", "ACTIVE", "ORDERS", "REVENUE"
            );
            println!("{}", "-".repeat(58));
            for r in &overview.restaurants {
                println!(
                    "{:<24} {:<8} {:>8} {:>15}",
                    r.name,
                    if r.is_active { "yes" } else { "no" },
                    r.totals.order_count,
                    format_currency(r.totals.total_revenue, &r.currency)
                );
            }
            println!("{}", "-".repeat(58));
            println!(
                "{:<24} {:<8} {:>8} {:>15}",
                "TOTAL",
                "",
                overview.order_count,
                format_cents(overview.total_revenue)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item() {
        assert_eq!(
            parse_item("Espresso:3.50:2").unwrap(),
            ("Espresso".to_string(), 350, 2)
        );
        assert_eq!(
            parse_item("Set: lunch:12:1").unwrap(),
            ("Set: lunch".to_string(), 1200, 1)
        );
        assert!(parse_item("Espresso:3.50").is_err());
        assert!(parse_item("Espresso:abc:1").is_err());
        assert!(parse_item("Espresso:3.50:x").is_err());
    }

    #[test]
    fn test_cli_parses_global_credentials() {
        let cli = Cli::try_parse_from([
            "tabletop",
            "--user",
            "sahil",
            "--password",
            "secret1",
            "stats",
            "--period",
            "month",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.user.as_deref(), Some("sahil"));
        assert!(matches!(cli.command, Commands::Stats { ref period, .. } if period.as_str() == "month"));
    }

    #[test]
    fn test_parse_recipe_line() {
        let id = Uuid::new_v4();
        let line = parse_recipe_line(&format!("{id}:0.25")).unwrap();
        assert_eq!(line.ingredient_id, id);
        assert_eq!(line.quantity, 0.25);

        assert!(parse_recipe_line("flour:1").is_err());
        assert!(parse_recipe_line(&format!("{id}")).is_err());
        assert!(parse_recipe_line(&format!("{id}:lots")).is_err());
    }

    #[test]
    fn test_cli_parses_staff_role_and_unit() {
        let cli = Cli::try_parse_from([
            "tabletop",
            "staff",
            "add",
            "aysel",
            "--name",
            "Aysel Quliyeva",
            "--staff-password",
            "1234",
            "--role",
            "waiter",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Staff(StaffCommands::Add {
                role: StaffRole::Waiter,
                branch: None,
                ..
            })
        ));

        let cli = Cli::try_parse_from(["tabletop", "ingredient", "add", "Un", "--unit", "kg"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ingredient(IngredientCommands::Add { unit: Unit::Kg, .. })
        ));
        assert!(
            Cli::try_parse_from(["tabletop", "ingredient", "add", "Un", "--unit", "lb"]).is_err()
        );
    }

    #[test]
    fn test_cli_requires_recipe_lines() {
        assert!(
            Cli::try_parse_from(["tabletop", "semi-finished", "add", "Xəmir", "--unit", "kg"])
                .is_err()
        );
    }

    #[test]
    fn test_cli_parses_table_status() {
        let cli = Cli::try_parse_from(["tabletop", "table", "status", "4", "occupied"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Table(TableCommands::Status {
                number: 4,
                status: TableStatus::Occupied
            })
        ));
    }
}
