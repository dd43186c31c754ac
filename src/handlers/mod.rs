pub mod customers;
pub mod exports;
pub mod inventory;
pub mod orders;
pub mod settings;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        customers::CustomerService, inventory::InventoryService, lifecycle::OrderLifecycleService,
        orders::OrderService, settings::SettingsService,
    },
};
use std::sync::Arc;

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub lifecycle: OrderLifecycleService,
    pub inventory: InventoryService,
    pub customers: CustomerService,
    pub settings: SettingsService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            orders: OrderService::new(db.clone(), Some(event_sender.clone())),
            lifecycle: OrderLifecycleService::new(db.clone(), Some(event_sender.clone())),
            inventory: InventoryService::new(db.clone(), Some(event_sender.clone())),
            customers: CustomerService::new(db.clone(), Some(event_sender)),
            settings: SettingsService::new(db),
        }
    }
}
