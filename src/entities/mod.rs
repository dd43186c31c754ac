pub mod address;
pub mod customer;
pub mod inventory_level;
pub mod order;
pub mod order_item;
pub mod store_setting;
