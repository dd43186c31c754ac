use crate::{
    db::DbPool,
    entities::inventory_level,
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    models::OrderStatus,
    services::orders::{model_to_response, OrderResponse},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-order outcome of a bulk status update.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusFailure {
    pub order_id: Uuid,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusResult {
    pub updated: Vec<OrderResponse>,
    pub failures: Vec<BatchStatusFailure>,
}

/// Controller for order status transitions.
///
/// Enforces the strict lifecycle
/// `pending -> confirmed -> preparing -> ready -> out_for_delivery -> delivered`,
/// with cancellation reachable from any non-terminal state. Cancellation
/// releases the items' reserved stock in the same transaction.
#[derive(Clone)]
pub struct OrderLifecycleService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl OrderLifecycleService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Updates the status of an order, validating the transition.
    ///
    /// A same-status update succeeds without touching the row. Cancellation
    /// routed through here also releases reservations, identical to
    /// [`Self::cancel_order`] without a reason.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        if new_status == OrderStatus::Cancelled {
            return self.cancel_order(order_id, None).await;
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction for status update");
            ServiceError::DatabaseError(e)
        })?;

        let (updated, old_status) = self.apply_status(&txn, order_id, new_status).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit status update");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, from = %old_status, to = %new_status, "Order status updated");
        self.emit_status_change(order_id, &old_status, new_status).await;

        model_to_response(updated)
    }

    /// Advances an order along the single suggested forward step.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn advance(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;
        let current = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let status = parse_status(&current.status)?;
        let next = status.next_forward().ok_or_else(|| {
            ServiceError::InvalidTransition(format!(
                "Order {} is {} and cannot advance further",
                order_id, status
            ))
        })?;

        self.update_status(order_id, next).await
    }

    /// Cancels an order and releases each item's reserved stock in the same
    /// transaction. Releases are capped at what is actually reserved, so
    /// rows that never carried a reservation cannot fail the cancellation.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction for cancellation");
            ServiceError::DatabaseError(e)
        })?;

        let (updated, old_status) = self
            .apply_status(&txn, order_id, OrderStatus::Cancelled)
            .await?;

        // Same-status no-op: do not release twice
        let was_cancelled = OrderStatus::from_str(&old_status) == Ok(OrderStatus::Cancelled);
        let mut released = Vec::new();
        if !was_cancelled {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;

            for item in &items {
                if let Some(quantity) =
                    release_reservation_capped(&txn, item.product_id, item.portion_size_id, item.quantity)
                        .await?
                {
                    released.push((item.product_id, item.portion_size_id, quantity));
                }
            }
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit cancellation");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, released_lines = released.len(), "Order cancelled");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderCancelled { order_id, reason })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send order cancelled event");
            }
            for (product_id, portion_size_id, quantity) in released {
                if let Err(e) = event_sender
                    .send(Event::StockReleased {
                        product_id,
                        portion_size_id,
                        quantity,
                    })
                    .await
                {
                    warn!(error = %e, "Failed to send stock released event");
                }
            }
        }
        self.emit_status_change(order_id, &old_status, OrderStatus::Cancelled)
            .await;

        model_to_response(updated)
    }

    /// Updates several orders, one transaction each. A failure on one order
    /// does not stop the rest; the result carries a per-order outcome.
    #[instrument(skip(self, order_ids), fields(count = order_ids.len(), new_status = %new_status))]
    pub async fn batch_update_status(
        &self,
        order_ids: Vec<Uuid>,
        new_status: OrderStatus,
    ) -> Result<BatchStatusResult, ServiceError> {
        let mut updated = Vec::new();
        let mut failures = Vec::new();

        for order_id in order_ids {
            match self.update_status(order_id, new_status).await {
                Ok(order) => updated.push(order),
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "Bulk status update failed for order");
                    failures.push(BatchStatusFailure {
                        order_id,
                        error: e.response_message(),
                    });
                }
            }
        }

        info!(
            updated = updated.len(),
            failed = failures.len(),
            "Bulk status update finished"
        );

        Ok(BatchStatusResult { updated, failures })
    }

    /// Loads the order inside `txn`, validates the transition and persists
    /// the new status. Returns the updated model and the previous status
    /// string.
    async fn apply_status(
        &self,
        txn: &DatabaseTransaction,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<(order::Model, String), ServiceError> {
        let current = OrderEntity::find_by_id(order_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status_str = current.status.clone();
        let old_status = parse_status(&old_status_str)?;

        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot transition order {} from '{}' to '{}'",
                order_id, old_status, new_status
            )));
        }

        if old_status == new_status {
            return Ok((current, old_status_str));
        }

        let version = current.version;
        let mut active: OrderActiveModel = current.into();
        active.status = Set(new_status.to_string());
        active.version = Set(version + 1);
        let updated = active.update(txn).await?;

        Ok((updated, old_status_str))
    }

    async fn emit_status_change(&self, order_id: Uuid, old_status: &str, new_status: OrderStatus) {
        if old_status == new_status.to_string() {
            return;
        }
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send status changed event");
            }
        }
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw)
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status: {}", raw)))
}

/// Releases up to `quantity` of a reservation inside the transaction,
/// capped at what is reserved. Returns the released quantity, or `None`
/// when no ledger row exists for the pair or nothing is reserved.
async fn release_reservation_capped<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    portion_size_id: Uuid,
    quantity: i32,
) -> Result<Option<i32>, ServiceError> {
    loop {
        let level = inventory_level::Entity::find()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::PortionSizeId.eq(portion_size_id))
            .one(conn)
            .await?;

        let Some(level) = level else {
            return Ok(None);
        };

        let releasable = quantity.min(level.reserved_stock);
        if releasable <= 0 {
            return Ok(None);
        }

        let result = inventory_level::Entity::update_many()
            .col_expr(
                inventory_level::Column::ReservedStock,
                Expr::col(inventory_level::Column::ReservedStock).sub(releasable),
            )
            .col_expr(inventory_level::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::PortionSizeId.eq(portion_size_id))
            .filter(inventory_level::Column::ReservedStock.gte(releasable))
            .exec(conn)
            .await?;

        if result.rows_affected > 0 {
            return Ok(Some(releasable));
        }
        // A concurrent adjustment shrank the reservation between the read
        // and the guarded update; re-read and retry with the new cap.
    }
}
