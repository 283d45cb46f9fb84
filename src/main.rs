//! HAR DESIGN Commerce - boutique storefront and back-office service

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use hardesign_commerce::domain::aggregates::cart::CartLine;
use hardesign_commerce::domain::aggregates::custom_order::{CustomOrder, CustomOrderStatus};
use hardesign_commerce::domain::aggregates::order::{CustomerContact, Order, OrderStatus};
use hardesign_commerce::domain::aggregates::product::Category;
use hardesign_commerce::domain::catalog::{self, CatalogFilter, CatalogItem};
use hardesign_commerce::domain::events::DomainEvent;
use hardesign_commerce::domain::ledger::{
    summarize, CashSummary, DateRange, EntryKind, LedgerEntry, ManualEntry, PaymentMethod,
};
use hardesign_commerce::{store, CommerceError};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
}

impl AppState {
    /// Best-effort change notification; a missing or failing NATS
    /// connection never fails the request that triggered it.
    async fn publish(&self, event: DomainEvent) {
        let Some(nats) = &self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, change events disabled");
                None
            }
        },
        Err(_) => None,
    };
    let state = AppState { db, nats };

    let app = Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "hardesign-commerce"}))
            }),
        )
        .route("/api/v1/products", get(list_products).post(create_product))
        .route(
            "/api/v1/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/v1/models", get(list_models).post(create_model))
        .route("/api/v1/models/:id", delete(delete_model))
        .route("/api/v1/catalog", get(get_catalog))
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/status", post(update_order_status))
        .route(
            "/api/v1/custom-orders",
            get(list_custom_orders).post(create_custom_order),
        )
        .route(
            "/api/v1/custom-orders/:id/status",
            post(update_custom_order_status),
        )
        .route(
            "/api/v1/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/api/v1/transactions/summary", get(transactions_summary))
        .route("/api/v1/users", get(list_users).post(create_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("hardesign-commerce listening on 0.0.0.0:{}", port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?,
        app,
    )
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Products & couture models
// ---------------------------------------------------------------------------

async fn list_products(
    State(s): State<AppState>,
) -> Result<Json<Vec<store::ProductRow>>, CommerceError> {
    Ok(Json(store::list_products(&s.db).await?))
}

async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<store::ProductRow>, CommerceError> {
    Ok(Json(store::get_product(&s.db, id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "price must be positive"))]
    pub price: i64,
    #[serde(default)]
    pub image: String,
    pub category: String,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    #[serde(default)]
    pub stock: i32,
    pub description: Option<String>,
}

impl ProductRequest {
    fn into_new_product(self) -> Result<store::NewProduct, CommerceError> {
        self.validate()
            .map_err(|e| CommerceError::Validation(e.to_string()))?;
        let category: Category = self.category.parse()?;
        Ok(store::NewProduct {
            name: self.name,
            price: self.price,
            image: self.image,
            category: category.as_str().to_string(),
            stock: self.stock,
            description: self.description,
        })
    }
}

async fn create_product(
    State(s): State<AppState>,
    Json(r): Json<ProductRequest>,
) -> Result<(StatusCode, Json<store::ProductRow>), CommerceError> {
    let row = store::create_product(&s.db, r.into_new_product()?).await?;
    s.publish(DomainEvent::CatalogChanged).await;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<store::ProductRow>, CommerceError> {
    let row = store::update_product(&s.db, id, r.into_new_product()?).await?;
    s.publish(DomainEvent::CatalogChanged).await;
    Ok(Json(row))
}

async fn delete_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, CommerceError> {
    store::delete_product(&s.db, id).await?;
    s.publish(DomainEvent::CatalogChanged).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_models(
    State(s): State<AppState>,
) -> Result<Json<Vec<store::ModelRow>>, CommerceError> {
    Ok(Json(store::list_models(&s.db).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ModelRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "price must be positive"))]
    pub price: i64,
    #[serde(default)]
    pub image: String,
    pub description: Option<String>,
}

async fn create_model(
    State(s): State<AppState>,
    Json(r): Json<ModelRequest>,
) -> Result<(StatusCode, Json<store::ModelRow>), CommerceError> {
    r.validate()
        .map_err(|e| CommerceError::Validation(e.to_string()))?;
    let row = store::create_model(
        &s.db,
        store::NewModel {
            name: r.name,
            price: r.price,
            image: r.image,
            description: r.description,
        },
    )
    .await?;
    s.publish(DomainEvent::CatalogChanged).await;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn delete_model(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, CommerceError> {
    store::delete_model(&s.db, id).await?;
    s.publish(DomainEvent::CatalogChanged).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Catalog projection
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    pub category: Option<String>,
    pub price: Option<String>,
    pub sort: Option<String>,
}

async fn get_catalog(
    State(s): State<AppState>,
    Query(p): Query<CatalogParams>,
) -> Result<Json<Vec<CatalogItem>>, CommerceError> {
    let filter = CatalogFilter {
        category: p.category.as_deref().map(str::parse).transpose()?,
        price: p.price.as_deref().map(str::parse).transpose()?,
        sort: p.sort.as_deref().map(str::parse).transpose()?,
    };

    let products: Vec<catalog::ProductRecord> = store::list_products(&s.db)
        .await?
        .into_iter()
        .map(|p| catalog::ProductRecord {
            id: p.id,
            name: p.name,
            price: p.price,
            image: p.image,
            category: p.category,
            description: p.description,
            stock: p.stock,
            created_at: p.created_at,
        })
        .collect();
    let models: Vec<catalog::ModelRecord> = store::list_models(&s.db)
        .await?
        .into_iter()
        .map(|m| catalog::ModelRecord {
            id: m.id,
            name: m.name,
            price: m.price,
            image: m.image,
            description: m.description,
            created_at: m.created_at,
        })
        .collect();

    Ok(Json(catalog::apply(
        catalog::project(&products, &models),
        &filter,
    )))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

async fn list_orders(State(s): State<AppState>) -> Result<Json<Vec<Order>>, CommerceError> {
    Ok(Json(store::list_orders(&s.db).await?))
}

async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, CommerceError> {
    Ok(Json(store::get_order(&s.db, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub items: Vec<CartLine>,
}

async fn create_order(
    State(s): State<AppState>,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), CommerceError> {
    // checkout requires a signed-in user; an unknown id is rejected here
    // rather than producing an orphaned order
    store::get_user(&s.db, r.user_id).await?;
    let contact = CustomerContact {
        name: r.customer_name,
        phone: r.customer_phone,
        address: r.customer_address,
    };
    let order = store::create_order(&s.db, r.user_id, contact, r.items).await?;
    s.publish(DomainEvent::OrderPlaced {
        order_id: order.id,
        total: order.total,
    })
    .await;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    /// Acting admin; the stored role is checked, never trusted from the
    /// client.
    pub user_id: Uuid,
}

async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<StatusUpdateRequest>,
) -> Result<Json<Order>, CommerceError> {
    store::require_admin(&s.db, r.user_id).await?;
    let target: OrderStatus = r.status.parse()?;

    let order = match target {
        OrderStatus::Completed => {
            let order = store::fulfill_order(&s.db, id, r.user_id).await?;
            s.publish(DomainEvent::OrderFulfilled {
                order_id: order.id,
                total: order.total,
            })
            .await;
            s.publish(DomainEvent::CatalogChanged).await;
            order
        }
        OrderStatus::Pending => {
            return Err(CommerceError::Validation(
                "an order cannot return to pending".into(),
            ))
        }
        _ => {
            let order = store::set_order_status(&s.db, id, target).await?;
            s.publish(DomainEvent::OrderStatusChanged {
                order_id: order.id,
                status: target.as_str().to_string(),
            })
            .await;
            order
        }
    };
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Custom orders
// ---------------------------------------------------------------------------

async fn list_custom_orders(
    State(s): State<AppState>,
) -> Result<Json<Vec<CustomOrder>>, CommerceError> {
    Ok(Json(store::list_custom_orders(&s.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct CustomOrderRequest {
    pub customer_id: Uuid,
    pub model_id: Uuid,
    pub fabric_details: Option<String>,
    pub deadline: NaiveDate,
    pub price: i64,
    #[serde(default)]
    pub deposit: i64,
    pub notes: Option<String>,
    pub user_id: Uuid,
}

async fn create_custom_order(
    State(s): State<AppState>,
    Json(r): Json<CustomOrderRequest>,
) -> Result<(StatusCode, Json<CustomOrder>), CommerceError> {
    store::require_admin(&s.db, r.user_id).await?;
    let order = store::create_custom_order(
        &s.db,
        store::NewCustomOrder {
            customer_id: r.customer_id,
            model_id: r.model_id,
            fabric_details: r.fabric_details,
            deadline: r.deadline,
            price: r.price,
            deposit: r.deposit,
            notes: r.notes,
        },
    )
    .await?;
    s.publish(DomainEvent::CustomOrderCreated {
        custom_order_id: order.id,
        deposit: order.deposit,
    })
    .await;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn update_custom_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<StatusUpdateRequest>,
) -> Result<Json<CustomOrder>, CommerceError> {
    store::require_admin(&s.db, r.user_id).await?;
    let target: CustomOrderStatus = r.status.parse()?;
    if target == CustomOrderStatus::Pending {
        return Err(CommerceError::Validation(
            "a custom order cannot return to pending".into(),
        ));
    }
    let order = store::set_custom_order_status(&s.db, id, target).await?;
    s.publish(DomainEvent::CustomOrderStatusChanged {
        custom_order_id: order.id,
        status: target.as_str().to_string(),
    })
    .await;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Cash ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LedgerParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl LedgerParams {
    fn range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }
}

async fn list_transactions(
    State(s): State<AppState>,
    Query(p): Query<LedgerParams>,
) -> Result<Json<Vec<LedgerEntry>>, CommerceError> {
    Ok(Json(store::list_entries(&s.db, p.range()).await?))
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub description: String,
    pub payment_method: String,
    pub user_id: Uuid,
}

async fn create_transaction(
    State(s): State<AppState>,
    Json(r): Json<TransactionRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), CommerceError> {
    store::require_admin(&s.db, r.user_id).await?;
    let kind: EntryKind = r.kind.parse()?;
    let method: PaymentMethod = r.payment_method.parse()?;
    let entry = ManualEntry::new(kind, r.amount, r.description, method)?;
    let recorded = store::record_manual_entry(&s.db, entry, r.user_id).await?;
    s.publish(DomainEvent::LedgerEntryRecorded {
        entry_id: recorded.id,
        kind: recorded.kind.as_str().to_string(),
        amount: recorded.amount,
    })
    .await;
    Ok((StatusCode::CREATED, Json(recorded)))
}

async fn transactions_summary(
    State(s): State<AppState>,
    Query(p): Query<LedgerParams>,
) -> Result<Json<CashSummary>, CommerceError> {
    let range = p.range();
    let entries = store::list_entries(&s.db, range).await?;
    Ok(Json(summarize(&entries, range)))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub role: Option<String>,
}

async fn list_users(
    State(s): State<AppState>,
    Query(p): Query<UserParams>,
) -> Result<Json<Vec<store::UserRow>>, CommerceError> {
    let role = p.role.as_deref().unwrap_or("user");
    Ok(Json(store::list_users_by_role(&s.db, role).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserRequest {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
}

async fn create_user(
    State(s): State<AppState>,
    Json(r): Json<UserRequest>,
) -> Result<(StatusCode, Json<store::UserRow>), CommerceError> {
    r.validate()
        .map_err(|e| CommerceError::Validation(e.to_string()))?;
    let row = store::create_user(
        &s.db,
        store::NewUser {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}
