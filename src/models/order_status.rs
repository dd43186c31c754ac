use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Delivery lifecycle of an order.
///
/// Transitions are strict: each state admits the single next forward step,
/// plus cancellation from any non-terminal state. `Delivered` and
/// `Cancelled` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OrderStatus {
    Pending,
    // "processing" is what the legacy storefront called this stage
    #[strum(to_string = "confirmed", serialize = "processing")]
    #[serde(alias = "processing")]
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    #[strum(to_string = "cancelled", serialize = "canceled")]
    #[serde(alias = "canceled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The single suggested forward step the admin UI renders as a button.
    pub fn next_forward(&self) -> Option<OrderStatus> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether `self -> to` is an allowed transition. Same-status updates
    /// are allowed as no-ops.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        if *self == to {
            return true;
        }
        if to == Self::Cancelled {
            return !self.is_terminal();
        }
        self.next_forward() == Some(to)
    }
}

/// Payment state, tracked independently of the delivery lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Unpaid,
    Expired,
}
