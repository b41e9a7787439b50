//! Order aggregate types and the flat row read back from the join.

use crate::{OrderId, OrderStoreError, Result};

/// Header fields of an order: everything except its identity and items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHeader {
    /// When the order was placed. Kept exactly as the client sent it.
    pub ordered_at: String,
    pub customer_name: String,
}

impl OrderHeader {
    pub fn new(ordered_at: impl Into<String>, customer_name: impl Into<String>) -> Self {
        Self {
            ordered_at: ordered_at.into(),
            customer_name: customer_name.into(),
        }
    }
}

/// A line item owned by an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub item_code: String,
    pub description: String,
    pub quantity: i32,
}

impl OrderItem {
    pub fn new(
        item_code: impl Into<String>,
        description: impl Into<String>,
        quantity: i32,
    ) -> Self {
        Self {
            item_code: item_code.into(),
            description: description.into(),
            quantity,
        }
    }
}

/// An order that has not been persisted yet.
///
/// Header and items are written together by
/// [`OrderStore::create`](crate::OrderStore::create).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub header: OrderHeader,
    pub items: Vec<OrderItem>,
}

impl NewOrder {
    /// Creates an order with no items.
    pub fn new(ordered_at: impl Into<String>, customer_name: impl Into<String>) -> Self {
        Self {
            header: OrderHeader::new(ordered_at, customer_name),
            items: Vec::new(),
        }
    }

    /// Appends an item.
    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    /// Checks the order before it is written.
    ///
    /// An empty item code is indistinguishable from the "no item" marker
    /// produced by the outer join on read, so it is rejected here.
    pub fn validate(&self) -> Result<()> {
        for (position, item) in self.items.iter().enumerate() {
            if item.item_code.trim().is_empty() {
                return Err(OrderStoreError::validation(format!(
                    "item {position} has an empty item code"
                )));
            }
        }
        Ok(())
    }

    /// Attaches the store-assigned ID.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            header: self.header,
            items: self.items,
        }
    }
}

/// A persisted order together with its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub header: OrderHeader,
    /// Items in insertion order.
    pub items: Vec<OrderItem>,
}

/// One row of `orders LEFT JOIN order_items`.
///
/// The item columns are `NULL` when the order has no items.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRow {
    #[sqlx(try_from = "i64")]
    pub order_id: OrderId,
    pub ordered_at: String,
    pub customer_name: String,
    pub item_code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
}

impl OrderRow {
    /// Builds the row for an order that has no items.
    pub fn header_only(order_id: OrderId, header: &OrderHeader) -> Self {
        Self {
            order_id,
            ordered_at: header.ordered_at.clone(),
            customer_name: header.customer_name.clone(),
            item_code: None,
            description: None,
            quantity: None,
        }
    }

    /// Builds the row pairing an order with one of its items.
    pub fn with_item(order_id: OrderId, header: &OrderHeader, item: &OrderItem) -> Self {
        Self {
            item_code: Some(item.item_code.clone()),
            description: Some(item.description.clone()),
            quantity: Some(item.quantity),
            ..Self::header_only(order_id, header)
        }
    }

    /// Splits the row into its order header and item.
    ///
    /// The item is `None` when the item code is absent or empty.
    pub fn into_parts(self) -> (OrderId, OrderHeader, Option<OrderItem>) {
        let header = OrderHeader {
            ordered_at: self.ordered_at,
            customer_name: self.customer_name,
        };
        let item = match self.item_code {
            Some(code) if !code.is_empty() => Some(OrderItem {
                item_code: code,
                description: self.description.unwrap_or_default(),
                quantity: self.quantity.unwrap_or_default(),
            }),
            _ => None,
        };
        (self.order_id, header, item)
    }
}
