//! Shared harness for integration tests against an in-memory SQLite
//! database.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use sprout_api::{
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{customer, inventory_level},
    events,
    handlers::AppServices,
    services::orders::{CreateOrderItemRequest, CreateOrderRequest, OrderDetail},
    AppState,
};

/// Application state plus a ready-to-use router, backed by a fresh
/// in-memory SQLite database per test.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub state: AppState,
    router: Router,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // One connection only: each pooled connection of an in-memory
        // SQLite database would see its own empty schema.
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db = Arc::new(pool);

        let (event_sender, event_receiver) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(event_receiver));

        let cfg = test_config();
        let state = AppState::new(db.clone(), cfg, event_sender);
        let services = state.services.clone();

        let router = Router::new()
            .route("/health", get(sprout_api::health_check))
            .route("/status", get(sprout_api::api_status))
            .route("/api-docs/openapi.json", get(sprout_api::openapi_json))
            .nest("/api/v1", sprout_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            db,
            services,
            state,
            router,
            _event_task: event_task,
        }
    }

    /// Issue a JSON request against the router and return the response.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder
                    .body(Body::from(json.to_string()))
                    .expect("request build")
            }
            None => builder.body(Body::empty()).expect("request build"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn seed_customer(&self, name: &str, email: &str) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            phone: Set(None),
            status: Set("active".to_string()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed customer")
    }

    pub async fn seed_inventory(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
        current_stock: i32,
        reserved_stock: i32,
    ) -> inventory_level::Model {
        inventory_level::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            portion_size_id: Set(portion_size_id),
            current_stock: Set(current_stock),
            reserved_stock: Set(reserved_stock),
            weekly_limit: Set(50),
            last_restocked: Set(None),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed inventory level")
    }

    /// Create an order through the order service with a single line item.
    pub async fn create_order_for(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        portion_size_id: Uuid,
        quantity: i32,
        unit_price_zar: Decimal,
    ) -> OrderDetail {
        self.services
            .orders
            .create_order(CreateOrderRequest {
                customer_id,
                order_number: None,
                address_id: None,
                items: vec![CreateOrderItemRequest {
                    product_id,
                    portion_size_id,
                    quantity,
                    unit_price_zar,
                }],
                total_zar: None,
                delivery_date: None,
                payment_due_date: None,
                notes: None,
            })
            .await
            .expect("failed to create order")
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
    }
}

/// Decode a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decode a response body as text.
pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 response")
}

/// Assert a status code, surfacing the body on mismatch.
pub async fn assert_status(response: Response, expected: StatusCode) -> Value {
    let status = response.status();
    let body = response_json(response).await;
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body
}
