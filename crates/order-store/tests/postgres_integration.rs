//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the tables before
//! each test, so they are serialized. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use order_store::{
    ErrorKind, NewOrder, OrderHeader, OrderId, OrderItem, OrderStore, OrderStoreError,
    PostgresOrderStore,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

const FAILING_ITEM_CODE: &str = "FAIL";

const FAILING_ITEM_TRIGGER: &str = r#"
CREATE OR REPLACE FUNCTION reject_failing_item() RETURNS trigger AS $$
BEGIN
    IF NEW.item_code = 'FAIL' THEN
        RAISE EXCEPTION 'item insert rejected';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER reject_failing_item
    BEFORE INSERT ON order_items
    FOR EACH ROW EXECUTE FUNCTION reject_failing_item();
"#;

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Apply the schema through the store's own migrator
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresOrderStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();

            // Test-only trigger that rejects item rows coded FAIL, so a
            // mid-transaction insert failure can be provoked on demand
            sqlx::raw_sql(FAILING_ITEM_TRIGGER)
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

async fn count_rows(store: &PostgresOrderStore, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap()
}

fn ada_order() -> NewOrder {
    NewOrder::new("2024-01-01", "Ada").with_item(OrderItem::new("X1", "Widget", 2))
}

#[tokio::test]
#[serial]
async fn create_and_list_single_order() {
    let store = get_test_store().await;

    let created = store.create(ada_order()).await.unwrap();
    assert!(created.id.as_i64() > 0);

    let orders = store.list_all().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, created.id);
    assert_eq!(orders[0].header.customer_name, "Ada");
    assert_eq!(orders[0].header.ordered_at, "2024-01-01");
    assert_eq!(orders[0].items, vec![OrderItem::new("X1", "Widget", 2)]);
}

#[tokio::test]
#[serial]
async fn items_round_trip_in_insertion_order() {
    let store = get_test_store().await;

    let order = NewOrder::new("2024-05-05", "Grace")
        .with_item(OrderItem::new("C3", "third-alphabetically", 3))
        .with_item(OrderItem::new("A1", "first-alphabetically", 1))
        .with_item(OrderItem::new("B2", "second-alphabetically", 0));
    let created = store.create(order).await.unwrap();

    let orders = store.list_all().await.unwrap();
    assert_eq!(orders, vec![created]);
}

#[tokio::test]
#[serial]
async fn order_without_items_lists_with_empty_items() {
    let store = get_test_store().await;

    let created = store
        .create(NewOrder::new("2024-02-02", "Bob"))
        .await
        .unwrap();

    let orders = store.list_all().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, created.id);
    assert!(orders[0].items.is_empty());
}

#[tokio::test]
#[serial]
async fn list_on_empty_tables_is_empty() {
    let store = get_test_store().await;
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn failed_item_insert_rolls_back_whole_order() {
    let store = get_test_store().await;

    // The third insert is rejected by the database trigger
    let order = NewOrder::new("2024-01-01", "Ada")
        .with_item(OrderItem::new("OK1", "fine", 1))
        .with_item(OrderItem::new("OK2", "fine", 1))
        .with_item(OrderItem::new(FAILING_ITEM_CODE, "rejected", 1))
        .with_item(OrderItem::new("OK4", "never reached", 1));

    let err = store.create(order).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert!(matches!(err, OrderStoreError::Database(_)));

    assert!(store.list_all().await.unwrap().is_empty());
    assert_eq!(count_rows(&store, "orders").await, 0);
    assert_eq!(count_rows(&store, "order_items").await, 0);
}

#[tokio::test]
#[serial]
async fn failed_create_leaves_other_orders_untouched() {
    let store = get_test_store().await;
    let kept = store.create(ada_order()).await.unwrap();

    let bad =
        NewOrder::new("2024-01-01", "Bob").with_item(OrderItem::new(FAILING_ITEM_CODE, "", 1));
    assert!(store.create(bad).await.is_err());

    assert_eq!(store.list_all().await.unwrap(), vec![kept]);
}

#[tokio::test]
#[serial]
async fn long_item_code_round_trips() {
    let store = get_test_store().await;

    let code = "SKU-".repeat(20);
    let order =
        NewOrder::new("2024-01-01", "Ada").with_item(OrderItem::new(code.clone(), "Widget", 2));
    let created = store.create(order).await.unwrap();

    let orders = store.list_all().await.unwrap();
    assert_eq!(orders, vec![created]);
    assert_eq!(orders[0].items[0].item_code, code);
}

#[tokio::test]
#[serial]
async fn blank_item_code_is_rejected_before_writing() {
    let store = get_test_store().await;

    let order = ada_order().with_item(OrderItem::new("", "blank", 1));
    let err = store.create(order).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(count_rows(&store, "orders").await, 0);
}

#[tokio::test]
#[serial]
async fn update_changes_header_only() {
    let store = get_test_store().await;
    let created = store.create(ada_order()).await.unwrap();

    let header = OrderHeader::new("2024-12-31", "Ada Lovelace");
    let echoed = store.update(created.id, header.clone()).await.unwrap();
    assert_eq!(echoed, header);

    let orders = store.list_all().await.unwrap();
    assert_eq!(orders[0].header, header);
    assert_eq!(orders[0].items, created.items);
}

#[tokio::test]
#[serial]
async fn update_unknown_order_is_not_found() {
    let store = get_test_store().await;
    let created = store.create(ada_order()).await.unwrap();

    let missing = OrderId::new(created.id.as_i64() + 1000);
    let err = store
        .update(missing, OrderHeader::new("2025-01-01", "Nobody"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrderStoreError::NotFound(id) if id == missing));
    assert_eq!(store.list_all().await.unwrap(), vec![created]);
}

#[tokio::test]
#[serial]
async fn delete_twice_reports_not_found() {
    let store = get_test_store().await;
    let created = store.create(ada_order()).await.unwrap();

    store.delete(created.id).await.unwrap();
    let err = store.delete(created.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[serial]
async fn delete_unknown_order_mutates_nothing() {
    let store = get_test_store().await;
    let created = store.create(ada_order()).await.unwrap();

    let err = store.delete(OrderId::new(424242)).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.list_all().await.unwrap(), vec![created]);
}

#[tokio::test]
#[serial]
async fn delete_cascades_to_items() {
    let store = get_test_store().await;
    let doomed = store.create(ada_order()).await.unwrap();
    let kept = store
        .create(NewOrder::new("2024-01-02", "Bob").with_item(OrderItem::new("Z9", "Bolt", 4)))
        .await
        .unwrap();

    store.delete(doomed.id).await.unwrap();

    assert_eq!(count_rows(&store, "order_items").await, 1);
    assert_eq!(store.list_all().await.unwrap(), vec![kept]);
}

#[tokio::test]
#[serial]
async fn consecutive_lists_are_identical() {
    let store = get_test_store().await;
    for customer in ["Ada", "Bob", "Cy"] {
        store
            .create(
                NewOrder::new("2024-01-01", customer)
                    .with_item(OrderItem::new("A", "first", 1))
                    .with_item(OrderItem::new("B", "second", 2)),
            )
            .await
            .unwrap();
    }
    store
        .create(NewOrder::new("2024-01-01", "Empty"))
        .await
        .unwrap();

    let first = store.list_all().await.unwrap();
    let second = store.list_all().await.unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[tokio::test]
#[serial]
async fn ping_succeeds_against_live_database() {
    let store = get_test_store().await;
    assert!(store.ping().await.is_ok());
}
