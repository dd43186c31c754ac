use crate::{
    db::DbPool,
    entities::customer::{
        self, ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
    },
    entities::order::{self, Entity as OrderEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    models::OrderStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const CUSTOMER_STATUSES: &[&str] = &["active", "inactive"];

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    /// "active" or "inactive"
    pub status: Option<String>,
}

/// Customer profile with totals derived by aggregation, never stored.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub total_orders: u64,
    /// Lifetime spend, cancelled orders excluded
    pub total_spent_zar: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerModel>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Directory of storefront customers.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists customers, optionally filtered by a case-insensitive search
    /// over name and email.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        page: u64,
        per_page: u64,
        search: Option<&str>,
    ) -> Result<CustomerListResponse, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 200);

        let mut query = CustomerEntity::find();

        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(customer::Column::Name)))
                            .like(pattern.clone()),
                    )
                    .add(Expr::expr(Func::lower(Expr::col(customer::Column::Email))).like(pattern)),
            );
        }

        let paginator = query
            .order_by_asc(customer::Column::Name)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page - 1).await?;

        Ok(CustomerListResponse {
            customers,
            total,
            page,
            per_page,
        })
    }

    /// Fetches a customer with aggregated order totals.
    ///
    /// Totals are derived on read: `total_orders` counts every order,
    /// `total_spent_zar` sums non-cancelled orders only.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<CustomerProfile, ServiceError> {
        let db = &*self.db;

        let model = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", customer_id))
            })?;

        let orders = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .all(db)
            .await?;

        let cancelled = OrderStatus::Cancelled.to_string();
        let total_orders = orders.len() as u64;
        let total_spent_zar: Decimal = orders
            .iter()
            .filter(|o| o.status != cancelled)
            .map(|o| o.total_zar)
            .sum();

        Ok(CustomerProfile {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            status: model.status,
            created_at: model.created_at,
            total_orders,
            total_spent_zar,
        })
    }

    /// Updates a customer's profile fields. Email is immutable here; it is
    /// the storefront login identity.
    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request.validate()?;

        if let Some(status) = request.status.as_deref() {
            if !CUSTOMER_STATUSES.contains(&status) {
                return Err(ServiceError::InvalidStatus(format!(
                    "Unknown customer status: {} (expected one of {:?})",
                    status, CUSTOMER_STATUSES
                )));
            }
        }

        let db = &*self.db;
        let model = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", customer_id))
            })?;

        let mut active: CustomerActiveModel = model.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        let updated = active.update(db).await?;
        info!(customer_id = %customer_id, "Customer updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CustomerUpdated(customer_id)).await {
                warn!(error = %e, "Failed to send customer updated event");
            }
        }

        Ok(updated)
    }
}
