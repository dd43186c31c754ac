use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ledger row per sellable SKU: a (product, portion size) pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub portion_size_id: Uuid,
    pub current_stock: i32,
    pub reserved_stock: i32,
    pub weekly_limit: i32,
    pub last_restocked: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Quantity sellable right now.
    pub fn available_stock(&self) -> i32 {
        self.current_stock - self.reserved_stock
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        active_model.updated_at = Set(Some(Utc::now()));
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_stock_is_current_minus_reserved() {
        let model = Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            portion_size_id: Uuid::new_v4(),
            current_stock: 12,
            reserved_stock: 5,
            weekly_limit: 50,
            last_restocked: None,
            updated_at: None,
        };
        assert_eq!(model.available_stock(), 7);
    }
}
