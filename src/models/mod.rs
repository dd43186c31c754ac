pub mod date_range;
pub mod order_status;

pub use date_range::DateRange;
pub use order_status::{OrderStatus, PaymentStatus};
