use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::order::{OrderStatus, PaymentMethod},
    errors::ServiceError,
    services::intake::PlaceOrderRequest,
    services::orders::OrderWithItems,
    ApiResponse, AppState,
};

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_my_orders))
        .route("/:id", get(get_order))
}

pub fn admin_orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_orders))
        .route("/:id/status", patch(update_order_status))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub discount_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<&OrderWithItems> for OrderResponse {
    fn from(value: &OrderWithItems) -> Self {
        Self {
            id: value.order.id,
            user_id: value.order.user_id,
            address_id: value.order.address_id,
            status: value.order.status,
            total: value.order.total,
            payment_method: value.order.payment_method,
            notes: value.order.notes.clone(),
            coupon_code: value.order.coupon_code.clone(),
            discount_amount: value.order.discount_amount,
            created_at: value.order.created_at,
            updated_at: value.order.updated_at,
            items: value
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrderResponse {
    pub order: OrderResponse,
    pub discount_applied: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Place a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<PlacedOrderResponse>),
        (status = 400, description = "Invalid cart or coupon", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product or coupon", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let placed = state.intake.place_order(user.id, payload).await?;

    let response = PlacedOrderResponse {
        order: OrderResponse::from(&placed.order),
        discount_applied: placed.discount_applied,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// The authenticated customer's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders for the authenticated customer", body = ApiResponse<Vec<OrderResponse>>)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.orders.list_orders_for_user(user.id).await?;
    let response: Vec<OrderResponse> = orders.iter().map(OrderResponse::from).collect();
    Ok(Json(ApiResponse::success(response)))
}

/// A single order with its items; owner or admin only
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .orders
        .get_order_with_items(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

    if order.order.user_id != user.id && !user.is_admin() {
        // Don't leak the existence of other customers' orders.
        return Err(ServiceError::NotFound(format!("Order {} not found", id)));
    }

    Ok(Json(ApiResponse::success(OrderResponse::from(&order))))
}

/// All orders (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    responses(
        (status = 200, description = "All orders", body = ApiResponse<Vec<OrderResponse>>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let orders = state.orders.list_all_orders().await?;
    let response: Vec<OrderResponse> = orders.iter().map(OrderResponse::from).collect();
    Ok(Json(ApiResponse::success(response)))
}

/// Transition an order's status (admin)
#[utoipa::path(
    patch,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 403, description = "Admin access required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.orders.update_order_status(id, payload.status).await?;

    let order = state
        .orders
        .get_order_with_items(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

    Ok(Json(ApiResponse::success(OrderResponse::from(&order))))
}
