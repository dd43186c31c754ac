use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted by the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled {
        order_id: Uuid,
        reason: Option<String>,
    },
    PaymentStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    InventoryAdjusted {
        product_id: Uuid,
        portion_size_id: Uuid,
        current_delta: i32,
        reserved_delta: i32,
    },
    StockReserved {
        product_id: Uuid,
        portion_size_id: Uuid,
        quantity: i32,
    },
    StockReleased {
        product_id: Uuid,
        portion_size_id: Uuid,
        quantity: i32,
    },
    CustomerUpdated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes events off the channel and logs them. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(
                order_id = %order_id,
                from = %old_status,
                to = %new_status,
                "order status changed"
            ),
            Event::PaymentStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(
                order_id = %order_id,
                from = %old_status,
                to = %new_status,
                "payment status changed"
            ),
            other => info!(event = ?other, "event processed"),
        }
    }
    info!("Event channel closed; processor exiting");
}
