//! Order CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use order_store::{NewOrder, Order, OrderHeader, OrderId, OrderItem, OrderStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub store: S,
}

impl<S: OrderStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub ordered_at: String,
    pub customer_name: String,
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub ordered_at: String,
    pub customer_name: String,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub ordered_at: String,
    pub customer_name: String,
    pub items: Vec<OrderItemPayload>,
}

/// Header-only confirmation of an update. Items are not re-read.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedOrderResponse {
    pub id: OrderId,
    pub ordered_at: String,
    pub customer_name: String,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

/// Line item as it appears on the wire, in both directions.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemPayload {
    pub item_code: String,
    pub description: String,
    pub quantity: i32,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(req: CreateOrderRequest) -> Self {
        req.items.into_iter().fold(
            NewOrder::new(req.ordered_at, req.customer_name),
            |order, item| {
                order.with_item(OrderItem::new(
                    item.item_code,
                    item.description,
                    item.quantity,
                ))
            },
        )
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            ordered_at: order.header.ordered_at,
            customer_name: order.header.customer_name,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemPayload {
                    item_code: item.item_code,
                    description: item.description,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order together with its items.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = payload?;

    let order = state.store.create(req.into()).await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — list every order with its items.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.list_all().await?;

    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// PUT /orders/:id — replace the order's timestamp and customer name.
#[tracing::instrument(skip(state, payload))]
pub async fn update<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<UpdatedOrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = payload?;

    let header = state
        .store
        .update(order_id, OrderHeader::new(req.ordered_at, req.customer_name))
        .await?;

    Ok(Json(UpdatedOrderResponse {
        id: order_id,
        ordered_at: header.ordered_at,
        customer_name: header.customer_name,
    }))
}

/// DELETE /orders/:id — delete the order and its items.
#[tracing::instrument(skip(state))]
pub async fn delete<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;

    state.store.delete(order_id).await?;

    Ok(Json(DeletedResponse {
        message: "Success delete",
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::Validation(format!("Invalid ID format: {e}")))
}
