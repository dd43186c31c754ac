//! Sprout API Library
//!
//! Order lifecycle, inventory ledger and customer directory for the
//! Sprout Box delivery back-office.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod export;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
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
    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/bulk/status", post(handlers::orders::bulk_update_status))
        .route(
            "/orders/by-number/:order_number",
            get(handlers::orders::get_order_by_number),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/status", put(handlers::orders::update_order_status))
        .route("/orders/:id/advance", post(handlers::orders::advance_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route("/orders/:id/payment", put(handlers::orders::update_payment_status));

    let inventory = Router::new()
        .route(
            "/inventory",
            get(handlers::inventory::list_inventory).post(handlers::inventory::create_inventory_level),
        )
        .route("/inventory/low-stock", get(handlers::inventory::list_low_stock))
        .route("/inventory/adjust", post(handlers::inventory::adjust_stock))
        .route("/inventory/reserve", post(handlers::inventory::reserve_stock))
        .route("/inventory/release", post(handlers::inventory::release_stock))
        .route(
            "/inventory/weekly-limit",
            put(handlers::inventory::set_weekly_limit),
        )
        .route(
            "/inventory/:product_id/:portion_size_id",
            get(handlers::inventory::get_inventory_level),
        );

    let customers = Router::new()
        .route("/customers", get(handlers::customers::list_customers))
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer).put(handlers::customers::update_customer),
        );

    let settings = Router::new().route(
        "/settings/:category",
        get(handlers::settings::get_settings).put(handlers::settings::put_settings),
    );

    let exports = Router::new()
        .route("/exports/orders", get(handlers::exports::export_orders))
        .route("/exports/customers", get(handlers::exports::export_customers))
        .route("/exports/inventory", get(handlers::exports::export_inventory));

    Router::new()
        .merge(orders)
        .merge(inventory)
        .merge(customers)
        .merge(settings)
        .merge(exports)
}

/// API status endpoint
pub async fn api_status() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Health check endpoint with a database ping
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_healthy = state.db.ping().await.is_ok();
    Json(json!({
        "status": if db_healthy { "healthy" } else { "degraded" },
        "database": if db_healthy { "up" } else { "down" },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sprout API",
        description = "Order lifecycle, inventory ledger and customer directory for the Sprout Box back-office",
        license(name = "MIT")
    ),
    paths(
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::get_order_by_number,
        handlers::orders::create_order,
        handlers::orders::update_order_status,
        handlers::orders::advance_order,
        handlers::orders::cancel_order,
        handlers::orders::update_payment_status,
        handlers::orders::bulk_update_status,
        handlers::inventory::list_inventory,
        handlers::inventory::list_low_stock,
        handlers::inventory::get_inventory_level,
        handlers::inventory::create_inventory_level,
        handlers::inventory::adjust_stock,
        handlers::inventory::reserve_stock,
        handlers::inventory::release_stock,
        handlers::inventory::set_weekly_limit,
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::settings::get_settings,
        handlers::settings::put_settings,
        handlers::exports::export_orders,
        handlers::exports::export_customers,
        handlers::exports::export_inventory,
    ),
    components(schemas(
        errors::ErrorResponse,
        models::OrderStatus,
        models::PaymentStatus,
        models::DateRange,
        services::orders::CreateOrderRequest,
        services::orders::CreateOrderItemRequest,
        services::orders::OrderResponse,
        services::orders::OrderItemResponse,
        services::orders::OrderDetail,
        services::customers::UpdateCustomerRequest,
        services::customers::CustomerProfile,
        services::lifecycle::BatchStatusResult,
        services::lifecycle::BatchStatusFailure,
        handlers::orders::UpdateOrderStatusRequest,
        handlers::orders::UpdatePaymentStatusRequest,
        handlers::orders::CancelOrderRequest,
        handlers::orders::BulkStatusRequest,
        handlers::inventory::InventoryLevelResponse,
        handlers::inventory::StockStatus,
        handlers::inventory::CreateInventoryLevelRequest,
        handlers::inventory::AdjustStockRequest,
        handlers::inventory::ReservationRequest,
        handlers::inventory::WeeklyLimitRequest,
        entities::customer::Model,
    ))
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<Value> {
    Json(json!(ApiDoc::openapi()))
}
