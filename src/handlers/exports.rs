use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    export,
    models::{DateRange, OrderStatus},
    services::orders::OrderFilter,
    AppState,
};

/// Page size used when draining a full listing for download.
const EXPORT_PAGE_SIZE: u64 = 200;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderExportQuery {
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub range: DateRange,
}

fn csv_headers(filename: &str) -> Result<HeaderMap, ServiceError> {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?,
    );
    Ok(headers)
}

/// Download the (filtered) order listing as CSV
#[utoipa::path(
    get,
    path = "/api/v1/exports/orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("search" = Option<String>, Query, description = "Match against customer name, email and order number"),
        ("range" = Option<String>, Query, description = "Date range over created_at: 1d, 7d, 30d, 90d, 1y or all"),
    ),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
    )
)]
pub async fn export_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderExportQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut orders = Vec::new();
    let mut page = 1;
    loop {
        let filter = OrderFilter {
            status: query.status,
            search: query.search.clone(),
            date_range: query.range,
            page,
            per_page: EXPORT_PAGE_SIZE,
        };
        let batch = state.services.orders.list_orders(filter).await?;
        let fetched = batch.orders.len() as u64;
        orders.extend(batch.orders);
        if fetched < EXPORT_PAGE_SIZE {
            break;
        }
        page += 1;
    }

    let body = export::orders_csv(&orders)?;
    let headers = csv_headers(&export::export_filename("orders", Utc::now()))?;
    Ok((headers, body))
}

/// Download the customer directory as CSV
#[utoipa::path(
    get,
    path = "/api/v1/exports/customers",
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
    )
)]
pub async fn export_customers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut customers = Vec::new();
    let mut page = 1;
    loop {
        let batch = state
            .services
            .customers
            .list_customers(page, EXPORT_PAGE_SIZE, None)
            .await?;
        let fetched = batch.customers.len() as u64;
        customers.extend(batch.customers);
        if fetched < EXPORT_PAGE_SIZE {
            break;
        }
        page += 1;
    }

    let body = export::customers_csv(&customers)?;
    let headers = csv_headers(&export::export_filename("customers", Utc::now()))?;
    Ok((headers, body))
}

/// Download the inventory ledger as CSV
#[utoipa::path(
    get,
    path = "/api/v1/exports/inventory",
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
    )
)]
pub async fn export_inventory(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut levels = Vec::new();
    let mut page = 1;
    loop {
        let (batch, _total) = state
            .services
            .inventory
            .list_levels(page, EXPORT_PAGE_SIZE)
            .await?;
        let fetched = batch.len() as u64;
        levels.extend(batch);
        if fetched < EXPORT_PAGE_SIZE {
            break;
        }
        page += 1;
    }

    let body = export::inventory_csv(&levels)?;
    let headers = csv_headers(&export::export_filename("inventory", Utc::now()))?;
    Ok((headers, body))
}
