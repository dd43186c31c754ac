use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{DateRange, OrderStatus, PaymentStatus},
    services::lifecycle::BatchStatusResult,
    services::orders::{
        CreateOrderRequest, OrderDetail, OrderFilter, OrderResponse,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub range: DateRange,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkStatusRequest {
    pub order_ids: Vec<Uuid>,
    pub status: OrderStatus,
}

/// List orders with filtering and pagination
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("search" = Option<String>, Query, description = "Match against customer name, email and order number"),
        ("range" = Option<String>, Query, description = "Date range over created_at: 1d, 7d, 30d, 90d, 1y or all"),
    ),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 400, description = "Invalid request parameters", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<PaginatedResponse<OrderResponse>> {
    let filter = OrderFilter {
        status: query.status,
        search: query.search,
        date_range: query.range,
        page: query.page,
        per_page: query.limit,
    };
    let result = state.services.orders.list_orders(filter).await?;
    let total_pages = result.total.div_ceil(result.per_page);

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.orders,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages,
    })))
}

/// Get a single order with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let detail = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Get an order by its human-readable order number
#[utoipa::path(
    get,
    path = "/api/v1/orders/by-number/{order_number}",
    params(("order_number" = String, Path, description = "Order number, e.g. SB-4F2A91C3")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<OrderDetail> {
    let id = state
        .services
        .orders
        .find_order_id_by_order_number(&order_number)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))?;
    let detail = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Create an order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), ServiceError> {
    let detail = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

/// Update an order's delivery status (strict transition rules apply)
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .lifecycle
        .update_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Advance an order along its suggested next step
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/advance",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order advanced", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order is terminal", body = crate::errors::ErrorResponse),
    )
)]
pub async fn advance_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.lifecycle.advance(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Cancel an order, releasing its reserved stock
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Order already delivered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelOrderRequest>>,
) -> ApiResult<OrderResponse> {
    let reason = request.and_then(|Json(r)| r.reason);
    let order = state.services.lifecycle.cancel_order(id, reason).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Update an order's payment status (independent of delivery status)
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .update_payment_status(id, request.payment_status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Update several orders' status in one request, reporting per-order
/// outcomes
#[utoipa::path(
    post,
    path = "/api/v1/orders/bulk/status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, description = "Bulk update finished", body = ApiResponse<BatchStatusResult>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    )
)]
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Json(request): Json<BulkStatusRequest>,
) -> ApiResult<BatchStatusResult> {
    if request.order_ids.is_empty() {
        return Err(ServiceError::InvalidInput(
            "order_ids must not be empty".to_string(),
        ));
    }
    let result = state
        .services
        .lifecycle
        .batch_update_status(request.order_ids, request.status)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
