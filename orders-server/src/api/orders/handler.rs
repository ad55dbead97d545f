//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use shared::util::{now_utc, random_order_id};
use shared::{LineItem, Order, OrderPage, PageRequest, StatusTransition};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::ServerState;
use crate::orders::StoreError;
use crate::utils::{AppError, AppResult};

/// Attempts at finding an unused random id before giving up
const MAX_ID_ATTEMPTS: usize = 3;

fn not_nil(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("nil_uuid"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(custom(function = "not_nil"))]
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(custom(function = "not_nil"))]
    pub customer_id: Uuid,
    #[validate(length(min = 1), nested)]
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: StatusTransition,
}

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Cursor returned by the previous page (absent = first page)
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_order_id(raw: &str) -> AppResult<u64> {
    raw.parse()
        .map_err(|_| AppError::invalid(format!("Invalid order id: {}", raw)))
}

fn parse_cursor(raw: Option<&str>) -> AppResult<u64> {
    match raw {
        None | Some("") => Ok(shared::CURSOR_START),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::invalid(format!("Invalid page cursor: {}", raw))),
    }
}

/// Create an order with a server-assigned id
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let Json(payload) = payload.map_err(|e| AppError::invalid(e.body_text()))?;
    payload.validate()?;

    let line_items: Vec<LineItem> = payload
        .line_items
        .iter()
        .map(|item| LineItem::new(item.item_id, item.quantity))
        .collect();

    let ctx = state.op_context();
    let mut attempt = 0;
    loop {
        attempt += 1;
        let order = Order::new(
            random_order_id(),
            payload.customer_id,
            line_items.clone(),
            now_utc(),
        );

        match state.store.insert(&ctx, &order).await {
            Ok(()) => {
                tracing::info!(order_id = order.order_id, "Order created");
                return Ok((StatusCode::CREATED, Json(order)));
            }
            Err(StoreError::Conflict(id)) if attempt < MAX_ID_ATTEMPTS => {
                tracing::warn!(order_id = id, attempt, "Order id collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// List one page of orders
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<OrderPage>> {
    let cursor = parse_cursor(query.page.as_deref())?;
    let page = state
        .store
        .get_all(
            &state.op_context(),
            PageRequest::new(cursor, state.config.page_size),
        )
        .await?;
    Ok(Json(page))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order_id = parse_order_id(&id)?;
    let order = state.store.get(&state.op_context(), order_id).await?;
    Ok(Json(order))
}

/// Advance the order lifecycle (read-modify-write)
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<Json<Order>> {
    let order_id = parse_order_id(&id)?;
    let Json(payload) = payload.map_err(|e| AppError::invalid(e.body_text()))?;

    let ctx = state.op_context();
    let mut order = state.store.get(&ctx, order_id).await?;
    order
        .apply_transition(payload.status, now_utc())
        .map_err(|e| AppError::validation(e.to_string()))?;
    state.store.update(&ctx, order_id, &order).await?;

    tracing::info!(order_id, status = ?order.status(), "Order status updated");
    Ok(Json(order))
}

/// Delete order by id
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let order_id = parse_order_id(&id)?;
    state.store.delete(&state.op_context(), order_id).await?;

    tracing::info!(order_id, "Order deleted");
    Ok(Json(MessageResponse {
        message: "order deleted".to_string(),
    }))
}
