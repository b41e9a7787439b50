use async_trait::async_trait;

use crate::{NewOrder, Order, OrderHeader, OrderId, Result};

/// Core trait for order persistence.
///
/// An order store is the only reader and writer of the `orders` and
/// `order_items` relations. Implementations hold no state between calls
/// beyond their connection handle and must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order together with all of its items.
    ///
    /// The header and every item are written atomically - either all rows
    /// become visible or none do. Returns the order carrying its new ID.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Retrieves every order with its items.
    ///
    /// Orders are returned by ascending ID, items in insertion order.
    /// Returns an empty vector when there are no orders.
    async fn list_all(&self) -> Result<Vec<Order>>;

    /// Replaces the header fields of an order. Items are not touched.
    ///
    /// Returns the supplied header on success, or `NotFound` when no order
    /// has the given ID.
    async fn update(&self, id: OrderId, header: OrderHeader) -> Result<OrderHeader>;

    /// Deletes an order and, through the cascade, its items.
    ///
    /// Returns `NotFound` when no order has the given ID.
    async fn delete(&self, id: OrderId) -> Result<()>;

    /// Checks that the backing store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Records a failed store operation.
///
/// Only persistence failures are counted; `NotFound` and `Validation` are
/// ordinary outcomes reported back to the caller.
pub(crate) fn record_outcome<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(ref err) = result
        && err.kind() == crate::ErrorKind::Store
    {
        metrics::counter!("order_store_errors_total", "operation" => operation).increment(1);
        tracing::error!(operation, error = %err, "order store operation failed");
    }
    result
}
