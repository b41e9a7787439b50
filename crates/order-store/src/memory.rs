use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    NewOrder, Order, OrderHeader, OrderId, OrderItem, OrderRow, OrderStoreError, Result, assemble,
    store::OrderStore,
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    orders: BTreeMap<OrderId, OrderHeader>,
    /// Rows of `order_items` in insertion order.
    items: Vec<(OrderId, OrderItem)>,
}

impl Tables {
    /// Produces the same rows as the PostgreSQL outer join.
    fn joined_rows(&self) -> Vec<OrderRow> {
        let mut items_by_order: BTreeMap<OrderId, Vec<&OrderItem>> = BTreeMap::new();
        for (order_id, item) in &self.items {
            items_by_order.entry(*order_id).or_default().push(item);
        }

        let mut rows = Vec::with_capacity(self.orders.len() + self.items.len());
        for (&id, header) in &self.orders {
            match items_by_order.get(&id) {
                Some(items) => rows.extend(
                    items
                        .iter()
                        .map(|item| OrderRow::with_item(id, header, item)),
                ),
                None => rows.push(OrderRow::header_only(id, header)),
            }
        }
        rows
    }
}

/// In-memory order store implementation for testing.
///
/// Keeps the two relations as plain collections and provides the same
/// interface and semantics as the PostgreSQL implementation, including the
/// cascade from `orders` to `order_items`.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of order headers stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of item rows stored across all orders.
    pub async fn item_count(&self) -> usize {
        self.tables.read().await.items.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        order.validate()?;

        let mut tables = self.tables.write().await;
        tables.last_id += 1;
        let id = OrderId::new(tables.last_id);

        tables.orders.insert(id, order.header.clone());
        tables
            .items
            .extend(order.items.iter().cloned().map(|item| (id, item)));

        Ok(order.into_order(id))
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let rows = self.tables.read().await.joined_rows();
        Ok(assemble(rows))
    }

    async fn update(&self, id: OrderId, header: OrderHeader) -> Result<OrderHeader> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .orders
            .get_mut(&id)
            .ok_or(OrderStoreError::NotFound(id))?;
        *stored = header.clone();
        Ok(header)
    }

    async fn delete(&self, id: OrderId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.remove(&id).is_none() {
            return Err(OrderStoreError::NotFound(id));
        }
        tables.items.retain(|(order_id, _)| *order_id != id);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
