//! Postgres persistence.
//!
//! Statuses and enums are stored as TEXT and converted through the domain
//! types on the way out. Order line items are a frozen JSONB snapshot of
//! the cart, so later product edits never touch historical orders.
//!
//! All status transitions are committed conditionally (`WHERE status IN
//! (...legal predecessors...)`), never read-then-written, so concurrent
//! admins cannot double-apply a transition.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::cart::{Cart, CartLine};
use crate::domain::aggregates::custom_order::{self, CustomOrder, CustomOrderStatus};
use crate::domain::aggregates::order::{CustomerContact, Order, OrderStatus};
use crate::domain::aggregates::product::checked_decrement;
use crate::domain::ledger::{DateRange, LedgerEntry, ManualEntry};
use crate::{CommerceError, Result};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: String,
    pub stock: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelRow {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub items: Json<Vec<CartLine>>,
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = CommerceError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            customer: CustomerContact {
                name: row.customer_name,
                phone: row.customer_phone,
                address: row.customer_address,
            },
            items: row.items.0,
            subtotal: row.subtotal,
            shipping: row.shipping,
            total: row.total,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub model_id: Uuid,
    pub model_name: String,
    pub model_image: Option<String>,
    pub fabric_details: Option<String>,
    pub deadline: NaiveDate,
    pub price: i64,
    pub deposit: i64,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CustomOrderRow> for CustomOrder {
    type Error = CommerceError;

    fn try_from(row: CustomOrderRow) -> Result<Self> {
        Ok(CustomOrder {
            id: row.id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            model_id: row.model_id,
            model_name: row.model_name,
            model_image: row.model_image,
            fabric_details: row.fabric_details,
            deadline: row.deadline,
            price: row.price,
            deposit: row.deposit,
            notes: row.notes,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub description: String,
    pub payment_method: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub source: Option<String>,
}

impl TryFrom<TransactionRow> for LedgerEntry {
    type Error = CommerceError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(LedgerEntry {
            id: row.id,
            kind: row.kind.parse()?,
            amount: row.amount,
            description: row.description,
            payment_method: row.payment_method.parse()?,
            timestamp: row.timestamp,
            user_id: row.user_id,
            source: row.source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Products & models
// ---------------------------------------------------------------------------

pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>> {
    let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<ProductRow> {
    sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CommerceError::ProductNotFound)
}

pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: String,
    pub stock: i32,
    pub description: Option<String>,
}

pub async fn create_product(pool: &PgPool, p: NewProduct) -> Result<ProductRow> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (id, name, price, image, category, stock, description, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&p.name)
    .bind(p.price)
    .bind(&p.image)
    .bind(&p.category)
    .bind(p.stock)
    .bind(&p.description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update_product(pool: &PgPool, id: Uuid, p: NewProduct) -> Result<ProductRow> {
    sqlx::query_as::<_, ProductRow>(
        "UPDATE products SET name = $2, price = $3, image = $4, category = $5, stock = $6, \
         description = $7, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&p.name)
    .bind(p.price)
    .bind(&p.image)
    .bind(&p.category)
    .bind(p.stock)
    .bind(&p.description)
    .fetch_optional(pool)
    .await?
    .ok_or(CommerceError::ProductNotFound)
}

pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CommerceError::ProductNotFound);
    }
    Ok(())
}

pub async fn list_models(pool: &PgPool) -> Result<Vec<ModelRow>> {
    let rows = sqlx::query_as::<_, ModelRow>("SELECT * FROM couture_models ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub struct NewModel {
    pub name: String,
    pub price: i64,
    pub image: String,
    pub description: Option<String>,
}

pub async fn create_model(pool: &PgPool, m: NewModel) -> Result<ModelRow> {
    let row = sqlx::query_as::<_, ModelRow>(
        "INSERT INTO couture_models (id, name, price, image, description, created_at) \
         VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&m.name)
    .bind(m.price)
    .bind(&m.image)
    .bind(&m.description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn delete_model(pool: &PgPool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM couture_models WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CommerceError::ModelNotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(Order::try_from).collect()
}

pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<Order> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CommerceError::OrderNotFound)?
        .try_into()
}

/// Checkout: freezes the cart into an order with status `pending`. Totals
/// are computed here, once, and never recomputed.
pub async fn create_order(
    pool: &PgPool,
    user_id: Uuid,
    customer: CustomerContact,
    lines: Vec<CartLine>,
) -> Result<Order> {
    customer.validate()?;
    let cart = Cart::from_lines(lines);
    if cart.is_empty() {
        return Err(CommerceError::Validation("cart is empty".into()));
    }

    let row = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (id, user_id, customer_name, customer_phone, customer_address, \
         items, subtotal, shipping, total, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(Json(cart.lines().to_vec()))
    .bind(cart.subtotal())
    .bind(cart.shipping())
    .bind(cart.total())
    .fetch_one(pool)
    .await?;
    row.try_into()
}

/// Side-effect-free status change (processing, cancelled). Fulfillment goes
/// through [`fulfill_order`] instead.
pub async fn set_order_status(pool: &PgPool, id: Uuid, target: OrderStatus) -> Result<Order> {
    debug_assert_ne!(target, OrderStatus::Completed);
    let allowed: Vec<String> = OrderStatus::allowed_predecessors(target)
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    let updated = sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET status = $2 WHERE id = $1 AND status = ANY($3) RETURNING *",
    )
    .bind(id)
    .bind(target.as_str())
    .bind(&allowed)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(row) => row.try_into(),
        None => Err(transition_failure(pool, id, target).await?),
    }
}

/// The one atomic operation in the system. In a single database
/// transaction: flip the order processing → completed, decrement stock for
/// every line, and append the sale to the cash ledger. Either all three
/// effects become visible or none do.
///
/// The status flip is conditional on the current status, so a second
/// invocation (or a concurrent admin) finds no `processing` row and gets a
/// conflict instead of a double decrement.
pub async fn fulfill_order(pool: &PgPool, id: Uuid, acting_user: Uuid) -> Result<Order> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET status = 'completed' WHERE id = $1 AND status = 'processing' RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        // dropped tx rolls back
        return Err(transition_failure(pool, id, OrderStatus::Completed).await?);
    };
    let order: Order = row.try_into()?;

    for line in &lock_order(&order.items) {
        let quantity = i32::try_from(line.quantity)
            .map_err(|_| CommerceError::Validation("line quantity out of range".into()))?;
        let stock: Option<i32> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(line.product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let stock = stock.ok_or(CommerceError::ProductNotFound)?;
        let remaining = checked_decrement(&line.name, stock, quantity)?;
        sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(line.product_id)
            .bind(remaining)
            .execute(&mut *tx)
            .await?;
    }

    let description = sale_description(&order);
    sqlx::query(
        "INSERT INTO transactions (id, type, amount, description, payment_method, timestamp, user_id, source) \
         VALUES ($1, 'vente', $2, $3, 'especes', NOW(), $4, 'ecommerce')",
    )
    .bind(Uuid::now_v7())
    .bind(order.total)
    .bind(&description)
    .bind(acting_user)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(order_id = %order.id, total = order.total, "order fulfilled");
    Ok(order)
}

/// Stock rows are always locked in product-id order, so two fulfillments
/// whose items overlap acquire the same locks in the same sequence and
/// cannot deadlock on each other.
fn lock_order(lines: &[CartLine]) -> Vec<CartLine> {
    let mut lines = lines.to_vec();
    lines.sort_by_key(|l| l.product_id);
    lines
}

/// Ledger description for a fulfilled web order.
fn sale_description(order: &Order) -> String {
    let short_id = order.id.simple().to_string();
    format!("Commande Web #{} - {}", &short_id[..8], order.customer.name)
}

/// Explains why a conditional order update matched nothing.
async fn transition_failure(pool: &PgPool, id: Uuid, target: OrderStatus) -> Result<CommerceError> {
    let actual: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(match actual {
        None => CommerceError::OrderNotFound,
        Some(actual) if actual == target.as_str() => CommerceError::Conflict { actual },
        Some(actual) => CommerceError::InvalidTransition {
            actual,
            requested: target.as_str().to_string(),
        },
    })
}

// ---------------------------------------------------------------------------
// Custom orders
// ---------------------------------------------------------------------------

pub async fn list_custom_orders(pool: &PgPool) -> Result<Vec<CustomOrder>> {
    let rows =
        sqlx::query_as::<_, CustomOrderRow>("SELECT * FROM custom_orders ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
    rows.into_iter().map(CustomOrder::try_from).collect()
}

pub struct NewCustomOrder {
    pub customer_id: Uuid,
    pub model_id: Uuid,
    pub fabric_details: Option<String>,
    pub deadline: NaiveDate,
    pub price: i64,
    pub deposit: i64,
    pub notes: Option<String>,
}

/// Creates a made-to-order piece, snapshotting the customer and model so
/// later edits to either never rewrite the order.
pub async fn create_custom_order(pool: &PgPool, c: NewCustomOrder) -> Result<CustomOrder> {
    custom_order::validate_pricing(c.price, c.deposit)?;

    let customer = get_user(pool, c.customer_id).await?;
    let model = sqlx::query_as::<_, ModelRow>("SELECT * FROM couture_models WHERE id = $1")
        .bind(c.model_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CommerceError::ModelNotFound)?;

    let row = sqlx::query_as::<_, CustomOrderRow>(
        "INSERT INTO custom_orders (id, customer_id, customer_name, customer_phone, model_id, \
         model_name, model_image, fabric_details, deadline, price, deposit, notes, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(customer.id)
    .bind(customer.full_name())
    .bind(&customer.phone)
    .bind(model.id)
    .bind(&model.name)
    .bind(Some(&model.image))
    .bind(&c.fabric_details)
    .bind(c.deadline)
    .bind(c.price)
    .bind(c.deposit)
    .bind(&c.notes)
    .fetch_one(pool)
    .await?;
    row.try_into()
}

/// Every custom-order transition is a pure field update; there is no
/// inventory and the ledger is untouched.
pub async fn set_custom_order_status(
    pool: &PgPool,
    id: Uuid,
    target: CustomOrderStatus,
) -> Result<CustomOrder> {
    let allowed: Vec<String> = CustomOrderStatus::allowed_predecessors(target)
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    let updated = sqlx::query_as::<_, CustomOrderRow>(
        "UPDATE custom_orders SET status = $2 WHERE id = $1 AND status = ANY($3) RETURNING *",
    )
    .bind(id)
    .bind(target.as_str())
    .bind(&allowed)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(row) => row.try_into(),
        None => {
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status FROM custom_orders WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
            Err(match actual {
                None => CommerceError::CustomOrderNotFound,
                Some(actual) => CommerceError::InvalidTransition {
                    actual,
                    requested: target.as_str().to_string(),
                },
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub async fn list_entries(pool: &PgPool, range: DateRange) -> Result<Vec<LedgerEntry>> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions \
         WHERE ($1::date IS NULL OR (timestamp AT TIME ZONE 'UTC')::date >= $1) \
           AND ($2::date IS NULL OR (timestamp AT TIME ZONE 'UTC')::date <= $2) \
         ORDER BY timestamp DESC",
    )
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(LedgerEntry::try_from).collect()
}

/// Appends a validated manual movement. The ledger has no update or delete
/// path anywhere in the service.
pub async fn record_manual_entry(
    pool: &PgPool,
    entry: ManualEntry,
    user_id: Uuid,
) -> Result<LedgerEntry> {
    let row = sqlx::query_as::<_, TransactionRow>(
        "INSERT INTO transactions (id, type, amount, description, payment_method, timestamp, user_id, source) \
         VALUES ($1, $2, $3, $4, $5, NOW(), $6, NULL) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(entry.kind.as_str())
    .bind(entry.amount)
    .bind(&entry.description)
    .bind(entry.payment_method.as_str())
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    row.try_into()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn list_users_by_role(pool: &PgPool, role: &str) -> Result<Vec<UserRow>> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE role = $1 ORDER BY last_name, first_name",
    )
    .bind(role)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<UserRow> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CommerceError::UserNotFound)
}

pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Registers a customer. The role is always `user`; the single admin is
/// seeded by migration, never minted through the API.
pub async fn create_user(pool: &PgPool, u: NewUser) -> Result<UserRow> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, first_name, last_name, email, phone, role, created_at) \
         VALUES ($1, $2, $3, $4, $5, 'user', NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&u.first_name)
    .bind(&u.last_name)
    .bind(&u.email)
    .bind(&u.phone)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Stored role is authoritative for access control; there is no identity
/// special-casing.
pub async fn require_admin(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    match role.as_deref() {
        Some("admin") => Ok(()),
        _ => Err(CommerceError::Forbidden),
    }
}
