use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::{
    entities::customer::Model as Customer,
    services::customers::{CustomerProfile, UpdateCustomerRequest},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// List customers with optional name/email search
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("search" = Option<String>, Query, description = "Case-insensitive match against name and email"),
    ),
    responses(
        (status = 200, description = "Customers retrieved", body = ApiResponse<PaginatedResponse<Customer>>),
    )
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Customer>> {
    let result = state
        .services
        .customers
        .list_customers(query.page, query.limit, query.search.as_deref())
        .await?;
    let total_pages = result.total.div_ceil(result.per_page);

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.customers,
        total: result.total,
        page: result.page,
        limit: result.per_page,
        total_pages,
    })))
}

/// Get a customer profile with aggregated order totals
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer retrieved", body = ApiResponse<CustomerProfile>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CustomerProfile> {
    let profile = state.services.customers.get_customer(id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Update a customer's name, phone or status (email is immutable)
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<Customer>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> ApiResult<Customer> {
    let customer = state.services.customers.update_customer(id, request).await?;
    Ok(Json(ApiResponse::success(customer)))
}
