//! Integration tests for the inventory ledger: delta adjustments with
//! negative-result rejection, reservations and the low-stock listing.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{assert_status, TestApp};
use serde_json::json;
use uuid::Uuid;

use sprout_api::errors::ServiceError;

#[tokio::test]
async fn adjust_applies_deltas_and_tracks_restock() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 10, 2).await;

    let level = app
        .services
        .inventory
        .adjust_stock(product_id, portion_id, 5, -1)
        .await
        .unwrap();

    assert_eq!(level.current_stock, 15);
    assert_eq!(level.reserved_stock, 1);
    assert_eq!(level.available_stock(), 14);
    assert!(level.last_restocked.is_some(), "positive delta marks a restock");
}

#[tokio::test]
async fn negative_result_is_rejected_and_row_untouched() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 3, 1).await;

    let err = app
        .services
        .inventory
        .adjust_stock(product_id, portion_id, -5, 0)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let level = app
        .services
        .inventory
        .get_level(product_id, portion_id)
        .await
        .unwrap();
    assert_eq!(level.current_stock, 3);
    assert_eq!(level.reserved_stock, 1);
}

#[tokio::test]
async fn over_release_is_rejected() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 10, 2).await;

    let err = app
        .services
        .inventory
        .release(product_id, portion_id, 3)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
}

#[tokio::test]
async fn reserve_respects_available_not_current() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    // 10 on hand but 8 already reserved: only 2 sellable
    app.seed_inventory(product_id, portion_id, 10, 8).await;

    let err = app
        .services
        .inventory
        .reserve(product_id, portion_id, 3)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let level = app
        .services
        .inventory
        .reserve(product_id, portion_id, 2)
        .await
        .unwrap();
    assert_eq!(level.reserved_stock, 10);
    assert_eq!(level.available_stock(), 0);
}

#[tokio::test]
async fn reserve_then_release_round_trips() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 12, 0).await;

    app.services
        .inventory
        .reserve(product_id, portion_id, 5)
        .await
        .unwrap();
    let level = app
        .services
        .inventory
        .release(product_id, portion_id, 5)
        .await
        .unwrap();

    assert_eq!(level.current_stock, 12);
    assert_eq!(level.reserved_stock, 0);
}

#[tokio::test]
async fn low_stock_listing_uses_available_not_current() {
    let app = TestApp::new().await;

    // available 10: not low
    let healthy = Uuid::new_v4();
    app.seed_inventory(healthy, Uuid::new_v4(), 10, 0).await;
    // available 5: at the threshold
    let at_threshold = Uuid::new_v4();
    app.seed_inventory(at_threshold, Uuid::new_v4(), 9, 4).await;
    // available 0: out of stock
    let depleted = Uuid::new_v4();
    app.seed_inventory(depleted, Uuid::new_v4(), 6, 6).await;

    let low = app.services.inventory.list_low_stock().await.unwrap();
    let product_ids: Vec<Uuid> = low.iter().map(|l| l.product_id).collect();

    assert!(!product_ids.contains(&healthy));
    assert!(product_ids.contains(&at_threshold));
    assert!(product_ids.contains(&depleted));
}

#[tokio::test]
async fn duplicate_pair_is_a_conflict() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 5, 0).await;

    let err = app
        .services
        .inventory
        .create_level(product_id, portion_id, 10, 20)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn weekly_limit_updates_only_that_field() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 7, 3).await;

    let level = app
        .services
        .inventory
        .set_weekly_limit(product_id, portion_id, 25)
        .await
        .unwrap();

    assert_eq!(level.weekly_limit, 25);
    assert_eq!(level.current_stock, 7);
    assert_eq!(level.reserved_stock, 3);
}

#[tokio::test]
async fn adjust_endpoint_reports_derived_stock_status() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 8, 0).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory/adjust",
            Some(json!({
                "product_id": product_id,
                "portion_size_id": portion_id,
                "current_delta": -4
            })),
        )
        .await;
    let body = assert_status(response, StatusCode::OK).await;

    assert_eq!(body["data"]["available_stock"], 4);
    assert_eq!(body["data"]["stock_status"], "low_stock");
}

#[tokio::test]
async fn insufficient_stock_is_422_over_http() {
    let app = TestApp::new().await;
    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 1, 0).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory/reserve",
            Some(json!({
                "product_id": product_id,
                "portion_size_id": portion_id,
                "quantity": 2
            })),
        )
        .await;
    assert_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;
}

#[tokio::test]
async fn unknown_pair_is_404_over_http() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/inventory/{}/{}", Uuid::new_v4(), Uuid::new_v4()),
            None,
        )
        .await;
    assert_status(response, StatusCode::NOT_FOUND).await;
}
