//! End-to-end tests for the order lifecycle: creation, the strict status
//! machine, payment tracking, cancellation with stock release and bulk
//! updates.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{assert_status, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use sprout_api::{
    errors::ServiceError,
    models::{OrderStatus, PaymentStatus},
};

#[tokio::test]
async fn create_order_computes_line_and_order_totals() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Thandi Nkosi", "thandi@example.co.za").await;

    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    let detail = app
        .create_order_for(customer.id, product_id, portion_id, 3, dec!(45.50))
        .await;

    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.payment_status, PaymentStatus::Pending);
    assert_eq!(detail.order.total_zar, dec!(136.50));
    assert_eq!(detail.order.version, 1);
    assert!(detail.order.order_number.starts_with("SB-"));

    assert_eq!(detail.items.len(), 1);
    let item = &detail.items[0];
    assert_eq!(item.line_total_zar, item.unit_price_zar * dec!(3));
}

#[tokio::test]
async fn create_order_rejects_mismatched_stated_total() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Sipho Dlamini", "sipho@example.co.za").await;

    let body = json!({
        "customer_id": customer.id,
        "items": [{
            "product_id": Uuid::new_v4(),
            "portion_size_id": Uuid::new_v4(),
            "quantity": 2,
            "unit_price_zar": "30.00"
        }],
        "total_zar": "99.99"
    });

    let response = app.request(Method::POST, "/api/v1/orders", Some(body)).await;
    assert_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn create_order_rejects_empty_item_list() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Lerato M", "lerato@example.co.za").await;

    let body = json!({ "customer_id": customer.id, "items": [] });
    let response = app.request(Method::POST, "/api/v1/orders", Some(body)).await;
    assert_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn advance_walks_the_forward_chain() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Anele P", "anele@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(60.00))
        .await;
    let order_id = detail.order.id;

    let expected = [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];
    for status in expected {
        let order = app.services.lifecycle.advance(order_id).await.unwrap();
        assert_eq!(order.status, status);
    }

    // Delivered is terminal
    let err = app.services.lifecycle.advance(order_id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn advance_leaves_total_and_payment_untouched() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Zanele K", "zanele@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 2, dec!(75.00))
        .await;

    let order = app.services.lifecycle.advance(detail.order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.total_zar, dec!(150.00));
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn status_skips_and_backward_moves_are_rejected() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Nomsa T", "nomsa@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(40.00))
        .await;
    let order_id = detail.order.id;

    // Pending -> Delivered skips the chain
    let err = app
        .services
        .lifecycle
        .update_status(order_id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // Move forward once, then try to go back
    app.services
        .lifecycle
        .update_status(order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    let err = app
        .services
        .lifecycle
        .update_status(order_id, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn same_status_update_is_a_noop_success() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Busi V", "busi@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(40.00))
        .await;

    let order = app
        .services
        .lifecycle
        .update_status(detail.order.id, OrderStatus::Pending)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.version, 1, "no-op must not bump the version");
}

#[tokio::test]
async fn update_status_on_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .services
        .lifecycle
        .update_status(Uuid::new_v4(), OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn legacy_processing_alias_maps_to_confirmed_over_http() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Kagiso R", "kagiso@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(55.00))
        .await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", detail.order.id),
            Some(json!({ "status": "processing" })),
        )
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["status"], "confirmed");

    // Same alias in a list filter
    let response = app
        .request(Method::GET, "/api/v1/orders?status=processing", None)
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn cancellation_releases_reserved_stock() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Palesa M", "palesa@example.co.za").await;

    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 20, 0).await;

    let detail = app
        .create_order_for(customer.id, product_id, portion_id, 4, dec!(50.00))
        .await;
    app.services
        .inventory
        .reserve(product_id, portion_id, 4)
        .await
        .unwrap();

    let order = app
        .services
        .lifecycle
        .cancel_order(detail.order.id, Some("customer request".into()))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let level = app
        .services
        .inventory
        .get_level(product_id, portion_id)
        .await
        .unwrap();
    assert_eq!(level.reserved_stock, 0);
    assert_eq!(level.current_stock, 20);
}

#[tokio::test]
async fn cancellation_release_is_capped_at_reserved() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Mandla J", "mandla@example.co.za").await;

    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    // Only 2 reserved even though the order wants 5
    app.seed_inventory(product_id, portion_id, 10, 2).await;

    let detail = app
        .create_order_for(customer.id, product_id, portion_id, 5, dec!(30.00))
        .await;

    app.services
        .lifecycle
        .cancel_order(detail.order.id, None)
        .await
        .unwrap();

    let level = app
        .services
        .inventory
        .get_level(product_id, portion_id)
        .await
        .unwrap();
    assert_eq!(level.reserved_stock, 0, "releases only what was reserved");
}

#[tokio::test]
async fn cancellation_with_nothing_reserved_leaves_ledger_untouched() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Zanele T", "zanele@example.co.za").await;

    let product_id = Uuid::new_v4();
    let portion_id = Uuid::new_v4();
    app.seed_inventory(product_id, portion_id, 10, 0).await;

    let detail = app
        .create_order_for(customer.id, product_id, portion_id, 3, dec!(30.00))
        .await;

    let order = app
        .services
        .lifecycle
        .cancel_order(detail.order.id, None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let level = app
        .services
        .inventory
        .get_level(product_id, portion_id)
        .await
        .unwrap();
    assert_eq!(level.reserved_stock, 0);
    assert_eq!(level.current_stock, 10);
}

#[tokio::test]
async fn cancelled_order_admits_no_further_transitions() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Karabo S", "karabo@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(25.00))
        .await;

    app.services
        .lifecycle
        .cancel_order(detail.order.id, None)
        .await
        .unwrap();

    let err = app
        .services
        .lifecycle
        .update_status(detail.order.id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn payment_status_toggles_paid_at_idempotently() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Dineo F", "dineo@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(80.00))
        .await;
    let order_id = detail.order.id;

    let paid = app
        .services
        .orders
        .update_payment_status(order_id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.status, OrderStatus::Pending, "delivery status untouched");

    let unpaid = app
        .services
        .orders
        .update_payment_status(order_id, PaymentStatus::Unpaid)
        .await
        .unwrap();
    assert_eq!(unpaid.payment_status, PaymentStatus::Unpaid);
    assert!(unpaid.paid_at.is_none());

    let repaid = app
        .services
        .orders
        .update_payment_status(order_id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(repaid.payment_status, PaymentStatus::Paid);
    assert!(repaid.paid_at.is_some());
}

#[tokio::test]
async fn bulk_update_reports_per_order_outcomes() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Lindiwe H", "lindiwe@example.co.za").await;

    let a = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(30.00))
        .await;
    let b = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 1, dec!(35.00))
        .await;
    let missing = Uuid::new_v4();

    let result = app
        .services
        .lifecycle
        .batch_update_status(vec![a.order.id, missing, b.order.id], OrderStatus::Confirmed)
        .await
        .unwrap();

    assert_eq!(result.updated.len(), 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].order_id, missing);

    for order in &result.updated {
        assert_eq!(order.status, OrderStatus::Confirmed);
    }
}

#[tokio::test]
async fn get_order_by_number_round_trips_over_http() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Ayanda B", "ayanda@example.co.za").await;
    let detail = app
        .create_order_for(customer.id, Uuid::new_v4(), Uuid::new_v4(), 2, dec!(42.00))
        .await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/by-number/{}", detail.order.order_number),
            None,
        )
        .await;
    let body = assert_status(response, StatusCode::OK).await;
    assert_eq!(body["data"]["id"], detail.order.id.to_string());
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_order_is_404_over_http() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", Uuid::new_v4()),
            None,
        )
        .await;
    let body = assert_status(response, StatusCode::NOT_FOUND).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn health_endpoint_reports_database_up() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "up");
}
