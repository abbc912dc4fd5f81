//! Mealdrop API Library
//!
//! Order intake for the Mealdrop food-delivery platform: catalog reads,
//! coupon evaluation, transactional order creation and hand-off to the
//! fulfillment queue.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod message_queue;
pub mod openapi;
pub mod services;

use axum::{extract::FromRef, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::JwtVerifier;
use crate::message_queue::OrderQueue;
use crate::services::{
    catalog::ProductCatalogService, coupons::CouponService, intake::OrderIntakeService,
    orders::OrderService, pricing::PricingResolver,
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub jwt: JwtVerifier,
    pub catalog: Arc<ProductCatalogService>,
    pub coupons: Arc<CouponService>,
    pub orders: Arc<OrderService>,
    pub intake: Arc<OrderIntakeService>,
}

impl AppState {
    /// Wires the service graph over one database pool and one queue seam.
    pub fn build(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        queue: Arc<dyn OrderQueue>,
    ) -> Self {
        let jwt = JwtVerifier::new(&config.jwt_secret);
        let catalog = Arc::new(ProductCatalogService::new(db.clone()));
        let coupons = Arc::new(CouponService::new(db.clone()));
        let orders = Arc::new(OrderService::new(db.clone()));
        let pricing = Arc::new(PricingResolver::new(catalog.clone()));
        let intake = Arc::new(OrderIntakeService::new(
            pricing,
            coupons.clone(),
            orders.clone(),
            queue,
        ));

        Self {
            db,
            config,
            jwt,
            catalog,
            coupons,
            orders,
            intake,
        }
    }
}

impl FromRef<AppState> for JwtVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", handlers::products::products_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/admin/orders", handlers::orders::admin_orders_routes())
        .nest("/admin/coupons", handlers::coupons::admin_coupons_routes())
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_carries_data() {
        let response = ApiResponse::success(42);
        assert!(response.success);
        assert_eq!(response.data, Some(42));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}
