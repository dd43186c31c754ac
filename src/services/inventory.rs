use crate::{
    db::DbPool,
    entities::inventory_level::{self, Entity as InventoryLevelEntity, Model as InventoryLevel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Available stock at or below this is flagged as low (fixed storefront
/// threshold).
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// True when the sellable quantity is at or below the low-stock threshold.
pub fn is_low_stock(record: &InventoryLevel) -> bool {
    record.available_stock() <= LOW_STOCK_THRESHOLD
}

/// True when nothing is sellable right now.
pub fn is_out_of_stock(record: &InventoryLevel) -> bool {
    record.available_stock() <= 0
}

/// Ledger of stock per (product, portion size) pair.
///
/// All mutations are delta-based and applied as single conditional updates;
/// a delta that would drive a counter negative is rejected and leaves the
/// row untouched. There is no absolute-overwrite path.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fetches the ledger row for a (product, portion size) pair.
    #[instrument(skip(self))]
    pub async fn get_level(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
    ) -> Result<InventoryLevel, ServiceError> {
        let db = &*self.db;
        InventoryLevelEntity::find()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::PortionSizeId.eq(portion_size_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Inventory for product {} portion {} not found",
                    product_id, portion_size_id
                ))
            })
    }

    /// Creates the ledger row for a new (product, portion size) pair.
    #[instrument(skip(self))]
    pub async fn create_level(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
        current_stock: i32,
        weekly_limit: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        use sea_orm::{ActiveModelTrait, Set};

        if current_stock < 0 || weekly_limit < 0 {
            return Err(ServiceError::InvalidInput(
                "Stock and weekly limit must not be negative".to_string(),
            ));
        }

        let db = &*self.db;
        let active = inventory_level::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            portion_size_id: Set(portion_size_id),
            current_stock: Set(current_stock),
            reserved_stock: Set(0),
            weekly_limit: Set(weekly_limit),
            last_restocked: Set(if current_stock > 0 { Some(Utc::now()) } else { None }),
            updated_at: Set(Some(Utc::now())),
        };
        let model = active.insert(db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!(
                    "Inventory for product {} portion {} already exists",
                    product_id, portion_size_id
                ))
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;
        Ok(model)
    }

    /// Lists ledger rows with pagination.
    #[instrument(skip(self))]
    pub async fn list_levels(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<InventoryLevel>, u64), ServiceError> {
        let db = &*self.db;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 200);

        let paginator = InventoryLevelEntity::find()
            .order_by_asc(inventory_level::Column::ProductId)
            .order_by_asc(inventory_level::Column::PortionSizeId)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    /// Lists rows whose available stock is at or below the low threshold.
    #[instrument(skip(self))]
    pub async fn list_low_stock(&self) -> Result<Vec<InventoryLevel>, ServiceError> {
        let db = &*self.db;
        let rows = InventoryLevelEntity::find()
            .filter(
                Expr::expr(
                    Expr::col(inventory_level::Column::CurrentStock)
                        .sub(Expr::col(inventory_level::Column::ReservedStock)),
                )
                .lte(LOW_STOCK_THRESHOLD),
            )
            .order_by_asc(inventory_level::Column::ProductId)
            .all(db)
            .await?;
        Ok(rows)
    }

    /// Applies additive deltas to the stock counters as one conditional
    /// update. Rejects (rather than clamps) any delta that would drive a
    /// counter negative.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
        current_delta: i32,
        reserved_delta: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();

        let mut update = InventoryLevelEntity::update_many()
            .col_expr(
                inventory_level::Column::CurrentStock,
                Expr::col(inventory_level::Column::CurrentStock).add(current_delta),
            )
            .col_expr(
                inventory_level::Column::ReservedStock,
                Expr::col(inventory_level::Column::ReservedStock).add(reserved_delta),
            )
            .col_expr(inventory_level::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::PortionSizeId.eq(portion_size_id));

        // Compare-and-swap guards: the row only moves if the result stays
        // non-negative.
        if current_delta < 0 {
            update = update.filter(inventory_level::Column::CurrentStock.gte(-current_delta));
        }
        if reserved_delta < 0 {
            update = update.filter(inventory_level::Column::ReservedStock.gte(-reserved_delta));
        }
        if current_delta > 0 {
            update = update.col_expr(inventory_level::Column::LastRestocked, Expr::value(now));
        }

        let result = update.exec(db).await?;

        if result.rows_affected == 0 {
            // Row exists but a guard failed, or the row is missing
            let level = self.get_level(product_id, portion_size_id).await?;
            return Err(ServiceError::InsufficientStock(format!(
                "Adjustment ({}, {}) would make stock negative: current {}, reserved {}",
                current_delta, reserved_delta, level.current_stock, level.reserved_stock
            )));
        }

        info!(
            product_id = %product_id,
            portion_size_id = %portion_size_id,
            current_delta,
            reserved_delta,
            "Stock adjusted"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::InventoryAdjusted {
                    product_id,
                    portion_size_id,
                    current_delta,
                    reserved_delta,
                })
                .await
            {
                warn!(error = %e, "Failed to send inventory adjusted event");
            }
        }

        self.get_level(product_id, portion_size_id).await
    }

    /// Moves quantity from available into reserved, failing when the
    /// sellable quantity does not cover the request.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
        quantity: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Reservation quantity must be positive".to_string(),
            ));
        }

        let db = &*self.db;
        let now = Utc::now();

        let result = InventoryLevelEntity::update_many()
            .col_expr(
                inventory_level::Column::ReservedStock,
                Expr::col(inventory_level::Column::ReservedStock).add(quantity),
            )
            .col_expr(inventory_level::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::PortionSizeId.eq(portion_size_id))
            .filter(
                Expr::expr(
                    Expr::col(inventory_level::Column::CurrentStock)
                        .sub(Expr::col(inventory_level::Column::ReservedStock)),
                )
                .gte(quantity),
            )
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            let level = self.get_level(product_id, portion_size_id).await?;
            return Err(ServiceError::InsufficientStock(format!(
                "Cannot reserve {}: only {} available",
                quantity,
                level.available_stock()
            )));
        }

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::StockReserved {
                    product_id,
                    portion_size_id,
                    quantity,
                })
                .await
            {
                warn!(error = %e, "Failed to send stock reserved event");
            }
        }

        self.get_level(product_id, portion_size_id).await
    }

    /// Returns reserved quantity to the sellable pool. Releasing more than
    /// is currently reserved is rejected.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
        quantity: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Release quantity must be positive".to_string(),
            ));
        }

        let level = self.adjust_stock(product_id, portion_size_id, 0, -quantity).await?;

        if let Some(event_sender) = &self.event_sender {
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

        Ok(level)
    }

    /// Updates the soft weekly restock cap.
    #[instrument(skip(self))]
    pub async fn set_weekly_limit(
        &self,
        product_id: Uuid,
        portion_size_id: Uuid,
        weekly_limit: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        if weekly_limit < 0 {
            return Err(ServiceError::InvalidInput(
                "Weekly limit must not be negative".to_string(),
            ));
        }

        let db = &*self.db;
        let result = InventoryLevelEntity::update_many()
            .col_expr(inventory_level::Column::WeeklyLimit, Expr::value(weekly_limit))
            .col_expr(inventory_level::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .filter(inventory_level::Column::PortionSizeId.eq(portion_size_id))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory for product {} portion {} not found",
                product_id, portion_size_id
            )));
        }

        self.get_level(product_id, portion_size_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(current: i32, reserved: i32) -> InventoryLevel {
        InventoryLevel {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            portion_size_id: Uuid::new_v4(),
            current_stock: current,
            reserved_stock: reserved,
            weekly_limit: 50,
            last_restocked: None,
            updated_at: None,
        }
    }

    #[test]
    fn low_stock_at_threshold_boundary() {
        assert!(is_low_stock(&level(5, 0)));
        assert!(is_low_stock(&level(10, 5)));
        assert!(!is_low_stock(&level(6, 0)));
    }

    #[test]
    fn out_of_stock_when_reserved_consumes_everything() {
        assert!(is_out_of_stock(&level(0, 0)));
        assert!(is_out_of_stock(&level(4, 4)));
        assert!(!is_out_of_stock(&level(1, 0)));
    }

    #[test]
    fn out_of_stock_implies_low_stock() {
        let record = level(3, 3);
        assert!(is_out_of_stock(&record));
        assert!(is_low_stock(&record));
    }
}
