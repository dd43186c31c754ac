pub mod customers;
pub mod inventory;
pub mod lifecycle;
pub mod orders;
pub mod settings;
