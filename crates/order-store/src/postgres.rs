use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::PgPool;

use crate::{
    AggregateAssembler, NewOrder, Order, OrderHeader, OrderId, OrderRow, OrderStoreError, Result,
    store::{OrderStore, record_outcome},
};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Writes the header and items in one transaction.
    ///
    /// Any early return drops `tx`, which rolls back everything written so far.
    async fn insert_aggregate(&self, order: &NewOrder) -> Result<OrderId> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (ordered_at, customer_name)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&order.header.ordered_at)
        .bind(&order.header.customer_name)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, item_code, description, quantity)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(&item.item_code)
            .bind(&item.description)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(OrderId::new(id))
    }

    async fn fetch_aggregates(&self) -> Result<Vec<Order>> {
        let mut rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT o.id AS order_id, o.ordered_at, o.customer_name,
                   oi.item_code, oi.description, oi.quantity
            FROM orders o
            LEFT JOIN order_items oi ON oi.order_id = o.id
            ORDER BY o.id ASC, oi.id ASC
            "#,
        )
        .fetch(&self.pool);

        let mut assembler = AggregateAssembler::new();
        while let Some(row) = rows.try_next().await? {
            assembler.push(row);
        }
        Ok(assembler.finish())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(items = order.items.len()))]
    async fn create(&self, order: NewOrder) -> Result<Order> {
        order.validate()?;

        let id = record_outcome("create", self.insert_aggregate(&order).await)?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%id, "order created");
        Ok(order.into_order(id))
    }

    #[tracing::instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Order>> {
        let orders = record_outcome("list_all", self.fetch_aggregates().await)?;

        metrics::histogram!("orders_listed").record(orders.len() as f64);
        tracing::debug!(count = orders.len(), "orders listed");
        Ok(orders)
    }

    #[tracing::instrument(skip(self, header))]
    async fn update(&self, id: OrderId, header: OrderHeader) -> Result<OrderHeader> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET ordered_at = $1, customer_name = $2
            WHERE id = $3
            "#,
        )
        .bind(&header.ordered_at)
        .bind(&header.customer_name)
        .bind(id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(OrderStoreError::from);
        let result = record_outcome("update", result)?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(id));
        }

        metrics::counter!("orders_updated_total").increment(1);
        tracing::info!(%id, "order updated");
        Ok(header)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: OrderId) -> Result<()> {
        // order_items rows go with the header via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(OrderStoreError::from);
        let result = record_outcome("delete", result)?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(id));
        }

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(%id, "order deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let result = sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(OrderStoreError::from);
        record_outcome("ping", result)
    }
}
