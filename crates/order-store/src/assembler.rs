//! Folds flat joined rows into order aggregates.

use crate::{Order, OrderRow};

/// Accumulates [`OrderRow`]s into [`Order`]s.
///
/// Rows belonging to one order must arrive contiguously, which holds for any
/// query ordered by order ID. A change of order ID closes the aggregate being
/// built and opens the next one.
#[derive(Debug, Default)]
pub struct AggregateAssembler {
    current: Option<Order>,
    finished: Vec<Order>,
}

impl AggregateAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next row.
    pub fn push(&mut self, row: OrderRow) {
        let (order_id, header, item) = row.into_parts();

        let same_order = self
            .current
            .as_ref()
            .is_some_and(|order| order.id == order_id);

        if !same_order {
            if let Some(done) = self.current.take() {
                self.finished.push(done);
            }
            self.current = Some(Order {
                id: order_id,
                header,
                items: Vec::new(),
            });
        }

        if let (Some(order), Some(item)) = (self.current.as_mut(), item) {
            order.items.push(item);
        }
    }

    /// Closes the aggregate in progress and returns all aggregates in the
    /// order their first row was seen.
    pub fn finish(mut self) -> Vec<Order> {
        if let Some(done) = self.current.take() {
            self.finished.push(done);
        }
        self.finished
    }
}

impl Extend<OrderRow> for AggregateAssembler {
    fn extend<I: IntoIterator<Item = OrderRow>>(&mut self, rows: I) {
        for row in rows {
            self.push(row);
        }
    }
}

/// Folds a complete row sequence into aggregates.
pub fn assemble<I>(rows: I) -> Vec<Order>
where
    I: IntoIterator<Item = OrderRow>,
{
    let mut assembler = AggregateAssembler::new();
    assembler.extend(rows);
    assembler.finish()
}
