//! Persistence for order aggregates.
//!
//! An order and its line items are written atomically and read back through
//! a single outer join, which [`AggregateAssembler`] folds into nested
//! [`Order`] values. [`PostgresOrderStore`] is the production backend;
//! [`InMemoryOrderStore`] offers the same contract for tests.

pub mod assembler;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use assembler::{AggregateAssembler, assemble};
pub use common::OrderId;
pub use error::{ErrorKind, OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use model::{NewOrder, Order, OrderHeader, OrderItem, OrderRow};
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
