//! Fulfillment commit, end to end against a real database.
//!
//! These tests exercise the whole transaction: the conditional status flip,
//! the row-locked stock decrements, and the ledger append. They need a
//! Postgres instance and are skipped when DATABASE_URL is unset.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use hardesign_commerce::domain::aggregates::cart::CartLine;
use hardesign_commerce::domain::aggregates::order::{CustomerContact, OrderStatus};
use hardesign_commerce::store::{self, NewProduct, NewUser};
use hardesign_commerce::CommerceError;

async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

async fn seed_customer(pool: &PgPool) -> Uuid {
    let user = store::create_user(
        pool,
        NewUser {
            first_name: "Fatou".into(),
            last_name: "Sow".into(),
            email: format!("fatou.{}@example.test", Uuid::now_v7().simple()),
            phone: "+221 77 000 00 00".into(),
        },
    )
    .await
    .expect("seed customer");
    user.id
}

async fn seed_product(pool: &PgPool, name: &str, price: i64, stock: i32) -> Uuid {
    let product = store::create_product(
        pool,
        NewProduct {
            name: name.into(),
            price,
            image: String::new(),
            category: "Vêtements".into(),
            stock,
            description: None,
        },
    )
    .await
    .expect("seed product");
    product.id
}

fn line(product_id: Uuid, name: &str, price: i64, quantity: u32) -> CartLine {
    CartLine {
        product_id,
        name: name.into(),
        price,
        image: String::new(),
        category: "Vêtements".into(),
        quantity,
    }
}

async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
    store::get_product(pool, product_id).await.expect("product").stock
}

async fn sale_rows_for(pool: &PgPool, order_id: Uuid) -> i64 {
    let short_id = order_id.simple().to_string();
    let pattern = format!("Commande Web #{}%", &short_id[..8]);
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE description LIKE $1")
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .expect("count ledger rows")
}

#[tokio::test]
async fn test_fulfillment_commits_once_and_repeats_conflict() {
    let Some(pool) = test_pool().await else { return };

    let customer = seed_customer(&pool).await;
    let robe = seed_product(&pool, "Robe wax", 15000, 5).await;
    let foulard = seed_product(&pool, "Foulard", 7000, 4).await;

    let order = store::create_order(
        &pool,
        customer,
        CustomerContact {
            name: "Fatou Sow".into(),
            phone: "+221 77 000 00 00".into(),
            address: "Médina, Dakar".into(),
        },
        vec![line(robe, "Robe wax", 15000, 2), line(foulard, "Foulard", 7000, 1)],
    )
    .await
    .expect("create order");
    store::set_order_status(&pool, order.id, OrderStatus::Processing)
        .await
        .expect("move to processing");

    let fulfilled = store::fulfill_order(&pool, order.id, customer)
        .await
        .expect("fulfill");
    assert_eq!(fulfilled.status, OrderStatus::Completed);
    assert_eq!(fulfilled.total, 39000);
    assert_eq!(stock_of(&pool, robe).await, 3);
    assert_eq!(stock_of(&pool, foulard).await, 3);
    assert_eq!(sale_rows_for(&pool, order.id).await, 1);

    // A repeat finds no processing row and must leave every effect untouched.
    let err = store::fulfill_order(&pool, order.id, customer)
        .await
        .expect_err("second fulfillment must fail");
    assert!(matches!(err, CommerceError::Conflict { .. }), "got {err:?}");
    assert_eq!(stock_of(&pool, robe).await, 3);
    assert_eq!(stock_of(&pool, foulard).await, 3);
    assert_eq!(sale_rows_for(&pool, order.id).await, 1);
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back_everything() {
    let Some(pool) = test_pool().await else { return };

    let customer = seed_customer(&pool).await;
    let boubou = seed_product(&pool, "Boubou", 20000, 3).await;

    let order = store::create_order(
        &pool,
        customer,
        CustomerContact {
            name: "Fatou Sow".into(),
            phone: "+221 77 000 00 00".into(),
            address: "Médina, Dakar".into(),
        },
        vec![line(boubou, "Boubou", 20000, 5)],
    )
    .await
    .expect("create order");
    store::set_order_status(&pool, order.id, OrderStatus::Processing)
        .await
        .expect("move to processing");

    let err = store::fulfill_order(&pool, order.id, customer)
        .await
        .expect_err("overdraw must fail");
    assert!(
        matches!(err, CommerceError::InsufficientStock { available: 3, requested: 5, .. }),
        "got {err:?}"
    );

    // Nothing committed: status flip, stock, and ledger all rolled back.
    let reread = store::get_order(&pool, order.id).await.expect("reread");
    assert_eq!(reread.status, OrderStatus::Processing);
    assert_eq!(stock_of(&pool, boubou).await, 3);
    assert_eq!(sale_rows_for(&pool, order.id).await, 0);
}
