use crate::{
    db::DbPool,
    entities::store_setting::{
        self, ActiveModel as SettingActiveModel, Entity as SettingEntity, Model as SettingModel,
    },
    errors::ServiceError,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Category-scoped key/value store for presentation configuration
/// (e.g. the "ui" color palette).
#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DbPool>,
}

impl SettingsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// All settings in a category as a key -> value map.
    #[instrument(skip(self))]
    pub async fn get_category(
        &self,
        category: &str,
    ) -> Result<BTreeMap<String, String>, ServiceError> {
        let db = &*self.db;
        let rows = SettingEntity::find()
            .filter(store_setting::Column::Category.eq(category))
            .order_by_asc(store_setting::Column::Key)
            .all(db)
            .await?;

        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    /// Inserts or overwrites one setting.
    #[instrument(skip(self, value))]
    pub async fn upsert(
        &self,
        category: &str,
        key: &str,
        value: &str,
    ) -> Result<SettingModel, ServiceError> {
        if category.trim().is_empty() || key.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Setting category and key must not be empty".to_string(),
            ));
        }

        let db = &*self.db;
        let existing = SettingEntity::find()
            .filter(store_setting::Column::Category.eq(category))
            .filter(store_setting::Column::Key.eq(key))
            .one(db)
            .await?;

        let updated = match existing {
            Some(model) => {
                let mut active: SettingActiveModel = model.into();
                active.value = Set(value.to_string());
                active.update(db).await?
            }
            None => {
                let active = SettingActiveModel {
                    id: Set(Uuid::new_v4()),
                    category: Set(category.to_string()),
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                    updated_at: Set(None),
                };
                active.insert(db).await?
            }
        };

        info!(category = %category, key = %key, "Store setting upserted");
        Ok(updated)
    }
}
