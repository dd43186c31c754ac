use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::inventory_level::Model as InventoryLevel,
    errors::ServiceError,
    services::inventory::{is_low_stock, is_out_of_stock},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// Ledger row plus the derived availability fields the admin UI renders.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLevelResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    pub current_stock: i32,
    pub reserved_stock: i32,
    pub available_stock: i32,
    pub weekly_limit: i32,
    pub stock_status: StockStatus,
    pub last_restocked: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl From<InventoryLevel> for InventoryLevelResponse {
    fn from(level: InventoryLevel) -> Self {
        let stock_status = if is_out_of_stock(&level) {
            StockStatus::OutOfStock
        } else if is_low_stock(&level) {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        };
        Self {
            id: level.id,
            product_id: level.product_id,
            portion_size_id: level.portion_size_id,
            current_stock: level.current_stock,
            reserved_stock: level.reserved_stock,
            available_stock: level.available_stock(),
            weekly_limit: level.weekly_limit,
            stock_status,
            last_restocked: level.last_restocked,
            updated_at: level.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInventoryLevelRequest {
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    #[serde(default)]
    pub current_stock: i32,
    #[serde(default)]
    pub weekly_limit: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    #[serde(default)]
    pub current_delta: i32,
    #[serde(default)]
    pub reserved_delta: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReservationRequest {
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WeeklyLimitRequest {
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    pub weekly_limit: i32,
}

/// List inventory levels with pagination
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Inventory retrieved", body = ApiResponse<PaginatedResponse<InventoryLevelResponse>>),
    )
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<InventoryLevelResponse>> {
    let (levels, total) = state
        .services
        .inventory
        .list_levels(query.page, query.limit)
        .await?;
    let limit = query.limit.clamp(1, 200);
    let total_pages = total.div_ceil(limit);

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: levels.into_iter().map(Into::into).collect(),
        total,
        page: query.page.max(1),
        limit,
        total_pages,
    })))
}

/// List ledger rows at or below the low-stock threshold
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Low-stock rows retrieved", body = ApiResponse<Vec<InventoryLevelResponse>>),
    )
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
) -> ApiResult<Vec<InventoryLevelResponse>> {
    let levels = state.services.inventory.list_low_stock().await?;
    Ok(Json(ApiResponse::success(
        levels.into_iter().map(Into::into).collect(),
    )))
}

/// Get the ledger row for one (product, portion size) pair
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{product_id}/{portion_size_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product id"),
        ("portion_size_id" = Uuid, Path, description = "Portion size id"),
    ),
    responses(
        (status = 200, description = "Inventory level retrieved", body = ApiResponse<InventoryLevelResponse>),
        (status = 404, description = "No ledger row for this pair", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_inventory_level(
    State(state): State<AppState>,
    Path((product_id, portion_size_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<InventoryLevelResponse> {
    let level = state
        .services
        .inventory
        .get_level(product_id, portion_size_id)
        .await?;
    Ok(Json(ApiResponse::success(level.into())))
}

/// Create the ledger row for a new (product, portion size) pair
#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryLevelRequest,
    responses(
        (status = 201, description = "Ledger row created", body = ApiResponse<InventoryLevelResponse>),
        (status = 409, description = "Row already exists for this pair", body = crate::errors::ErrorResponse),
    )
)]
pub async fn create_inventory_level(
    State(state): State<AppState>,
    Json(request): Json<CreateInventoryLevelRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InventoryLevelResponse>>), ServiceError> {
    let level = state
        .services
        .inventory
        .create_level(
            request.product_id,
            request.portion_size_id,
            request.current_stock,
            request.weekly_limit,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(level.into()))))
}

/// Apply additive deltas to the stock counters
#[utoipa::path(
    post,
    path = "/api/v1/inventory/adjust",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<InventoryLevelResponse>),
        (status = 404, description = "No ledger row for this pair", body = crate::errors::ErrorResponse),
        (status = 422, description = "Adjustment would make a counter negative", body = crate::errors::ErrorResponse),
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Json(request): Json<AdjustStockRequest>,
) -> ApiResult<InventoryLevelResponse> {
    let level = state
        .services
        .inventory
        .adjust_stock(
            request.product_id,
            request.portion_size_id,
            request.current_delta,
            request.reserved_delta,
        )
        .await?;
    Ok(Json(ApiResponse::success(level.into())))
}

/// Reserve stock for an order
#[utoipa::path(
    post,
    path = "/api/v1/inventory/reserve",
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Stock reserved", body = ApiResponse<InventoryLevelResponse>),
        (status = 422, description = "Not enough available stock", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reserve_stock(
    State(state): State<AppState>,
    Json(request): Json<ReservationRequest>,
) -> ApiResult<InventoryLevelResponse> {
    let level = state
        .services
        .inventory
        .reserve(request.product_id, request.portion_size_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(level.into())))
}

/// Release previously reserved stock back to the sellable pool
#[utoipa::path(
    post,
    path = "/api/v1/inventory/release",
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Stock released", body = ApiResponse<InventoryLevelResponse>),
        (status = 422, description = "Release exceeds the reserved quantity", body = crate::errors::ErrorResponse),
    )
)]
pub async fn release_stock(
    State(state): State<AppState>,
    Json(request): Json<ReservationRequest>,
) -> ApiResult<InventoryLevelResponse> {
    let level = state
        .services
        .inventory
        .release(request.product_id, request.portion_size_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(level.into())))
}

/// Set the soft weekly restock cap for a pair
#[utoipa::path(
    put,
    path = "/api/v1/inventory/weekly-limit",
    request_body = WeeklyLimitRequest,
    responses(
        (status = 200, description = "Weekly limit updated", body = ApiResponse<InventoryLevelResponse>),
        (status = 404, description = "No ledger row for this pair", body = crate::errors::ErrorResponse),
    )
)]
pub async fn set_weekly_limit(
    State(state): State<AppState>,
    Json(request): Json<WeeklyLimitRequest>,
) -> ApiResult<InventoryLevelResponse> {
    let level = state
        .services
        .inventory
        .set_weekly_limit(
            request.product_id,
            request.portion_size_id,
            request.weekly_limit,
        )
        .await?;
    Ok(Json(ApiResponse::success(level.into())))
}
