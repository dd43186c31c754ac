use crate::{
    db::DbPool,
    entities::customer,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{DateRange, OrderStatus, PaymentStatus},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    /// Assigned automatically when absent
    pub order_number: Option<String>,
    pub address_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,
    /// Stated total; must equal the sum of line totals when provided
    pub total_zar: Option<Decimal>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub payment_due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub unit_price_zar: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub address_id: Option<Uuid>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_zar: Decimal,
    pub delivery_date: Option<DateTime<Utc>>,
    pub payment_due_date: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    pub quantity: i32,
    pub unit_price_zar: Decimal,
    pub line_total_zar: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Filters for listing orders; all provided filters are ANDed.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Case-insensitive match against customer name, email and order number
    pub search: Option<String>,
    pub date_range: DateRange,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing orders against the database.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new order with its items in one transaction.
    ///
    /// The stated total (when provided) must equal the sum of line totals;
    /// each line total is `quantity * unit_price_zar`.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }

        let computed_total: Decimal = request
            .items
            .iter()
            .map(|item| item.unit_price_zar * Decimal::from(item.quantity))
            .sum();

        if let Some(stated) = request.total_zar {
            if stated != computed_total {
                return Err(ServiceError::ValidationError(format!(
                    "Stated total {} does not match sum of line totals {}",
                    stated, computed_total
                )));
            }
        }

        let db = &*self.db;
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = request
            .order_number
            .clone()
            .unwrap_or_else(generate_order_number);

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order_active_model = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            customer_id: Set(request.customer_id),
            address_id: Set(request.address_id),
            status: Set(OrderStatus::Pending.to_string()),
            payment_status: Set(PaymentStatus::Pending.to_string()),
            total_zar: Set(computed_total),
            delivery_date: Set(request.delivery_date),
            payment_due_date: Set(request.payment_due_date),
            paid_at: Set(None),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };

        let order_model = order_active_model.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_models = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let item_active_model = OrderItemActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                portion_size_id: Set(item.portion_size_id),
                quantity: Set(item.quantity),
                unit_price_zar: Set(item.unit_price_zar),
                line_total_zar: Set(item.unit_price_zar * Decimal::from(item.quantity)),
                created_at: Set(now),
            };
            let item_model = item_active_model.insert(&txn).await.map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to create order item");
                ServiceError::DatabaseError(e)
            })?;
            item_models.push(item_model);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, customer_id = %request.customer_id, "Order created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order created event");
            }
        }

        Ok(OrderDetail {
            order: model_to_response(order_model)?,
            items: item_models.iter().map(item_to_response).collect(),
        })
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db;

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await?;

        Ok(OrderDetail {
            order: model_to_response(order)?,
            items: items.iter().map(item_to_response).collect(),
        })
    }

    /// Resolves a human-readable order number to an order id.
    #[instrument(skip(self))]
    pub async fn find_order_id_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Uuid>, ServiceError> {
        let db = &*self.db;
        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(db)
            .await?;
        Ok(order.map(|o| o.id))
    }

    /// Lists orders matching all provided filters, newest first.
    ///
    /// The date range bounds `created_at` inclusively at both ends; text
    /// search matches case-insensitively against customer name, customer
    /// email and the order number.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db;
        let page = filter.page.max(1);
        let per_page = filter.per_page.clamp(1, 200);

        let mut query = OrderEntity::find();

        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query
                .join(JoinType::InnerJoin, order::Relation::Customer.def())
                .filter(
                    Condition::any()
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                order::Entity,
                                order::Column::OrderNumber,
                            ))))
                            .like(pattern.clone()),
                        )
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                customer::Entity,
                                customer::Column::Name,
                            ))))
                            .like(pattern.clone()),
                        )
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                customer::Entity,
                                customer::Column::Email,
                            ))))
                            .like(pattern),
                        ),
                );
        }

        if let Some((start, end)) = filter.date_range.bounds(Utc::now()) {
            query = query.filter(order::Column::CreatedAt.between(start, end));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let order_responses = orders
            .into_iter()
            .map(model_to_response)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            total = total,
            page = page,
            returned = order_responses.len(),
            "Orders listed"
        );

        Ok(OrderListResponse {
            orders: order_responses,
            total,
            page,
            per_page,
        })
    }

    /// Updates the payment status of an order, independently of its
    /// delivery status. Idempotent per call: re-marking the same status only
    /// rewrites the stored field.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        new_status: PaymentStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.payment_status.clone();
        let version = order.version;

        let mut active: OrderActiveModel = order.into();
        active.payment_status = Set(new_status.to_string());
        active.paid_at = Set(match new_status {
            PaymentStatus::Paid => Some(now),
            _ => None,
        });
        active.version = Set(version + 1);

        let updated = active.update(db).await?;

        info!(order_id = %order_id, from = %old_status, to = %new_status, "Payment status updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentStatusChanged {
                    order_id,
                    old_status,
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send payment status event");
            }
        }

        model_to_response(updated)
    }
}

/// Human-readable order number, e.g. `SB-4F2A91C3`.
fn generate_order_number() -> String {
    let id = Uuid::new_v4();
    let hex = id.simple().to_string();
    format!("SB-{}", hex[..8].to_uppercase())
}

pub(crate) fn model_to_response(model: OrderModel) -> Result<OrderResponse, ServiceError> {
    let status = OrderStatus::from_str(&model.status)
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status: {}", model.status)))?;
    let payment_status = PaymentStatus::from_str(&model.payment_status).map_err(|_| {
        ServiceError::InvalidStatus(format!("Unknown payment status: {}", model.payment_status))
    })?;

    Ok(OrderResponse {
        id: model.id,
        order_number: model.order_number,
        customer_id: model.customer_id,
        address_id: model.address_id,
        status,
        payment_status,
        total_zar: model.total_zar,
        delivery_date: model.delivery_date,
        payment_due_date: model.payment_due_date,
        paid_at: model.paid_at,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
        version: model.version,
    })
}

pub(crate) fn item_to_response(model: &OrderItemModel) -> OrderItemResponse {
    OrderItemResponse {
        id: model.id,
        product_id: model.product_id,
        portion_size_id: model.portion_size_id,
        quantity: model.quantity,
        unit_price_zar: model.unit_price_zar,
        line_total_zar: model.line_total_zar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_model() -> OrderModel {
        OrderModel {
            id: Uuid::new_v4(),
            order_number: "SB-0001A2B3".to_string(),
            customer_id: Uuid::new_v4(),
            address_id: None,
            status: "pending".to_string(),
            payment_status: "pending".to_string(),
            total_zar: dec!(125.50),
            delivery_date: None,
            payment_due_date: None,
            paid_at: None,
            notes: Some("Leave at gate".to_string()),
            created_at: Utc::now(),
            updated_at: None,
            version: 1,
        }
    }

    #[test]
    fn model_to_response_parses_statuses() {
        let model = sample_model();
        let id = model.id;
        let response = model_to_response(model).unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.status, OrderStatus::Pending);
        assert_eq!(response.payment_status, PaymentStatus::Pending);
        assert_eq!(response.total_zar, dec!(125.50));
    }

    #[test]
    fn model_to_response_rejects_unknown_status() {
        let mut model = sample_model();
        model.status = "shipped".to_string();
        assert!(matches!(
            model_to_response(model),
            Err(ServiceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn legacy_processing_status_maps_to_confirmed() {
        let mut model = sample_model();
        model.status = "processing".to_string();
        let response = model_to_response(model).unwrap();
        assert_eq!(response.status, OrderStatus::Confirmed);
    }

    #[test]
    fn order_numbers_are_prefixed_and_distinct() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert!(a.starts_with("SB-"));
        assert_eq!(a.len(), 11);
        assert_ne!(a, b);
    }
}
