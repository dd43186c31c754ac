use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::{ApiResponse, ApiResult, AppState};

/// Get every setting in a category as a key/value map
#[utoipa::path(
    get,
    path = "/api/v1/settings/{category}",
    params(("category" = String, Path, description = "Settings category, e.g. ui")),
    responses(
        (status = 200, description = "Settings retrieved (empty map for an unknown category)", body = ApiResponse<BTreeMap<String, String>>),
    )
)]
pub async fn get_settings(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<BTreeMap<String, String>> {
    let settings = state.services.settings.get_category(&category).await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// Upsert settings in a category; returns the full category afterwards
#[utoipa::path(
    put,
    path = "/api/v1/settings/{category}",
    params(("category" = String, Path, description = "Settings category, e.g. ui")),
    request_body = BTreeMap<String, String>,
    responses(
        (status = 200, description = "Settings stored", body = ApiResponse<BTreeMap<String, String>>),
        (status = 400, description = "Empty category or key", body = crate::errors::ErrorResponse),
    )
)]
pub async fn put_settings(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(entries): Json<BTreeMap<String, String>>,
) -> ApiResult<BTreeMap<String, String>> {
    for (key, value) in &entries {
        state.services.settings.upsert(&category, key, value).await?;
    }
    let settings = state.services.settings.get_category(&category).await?;
    Ok(Json(ApiResponse::success(settings)))
}
