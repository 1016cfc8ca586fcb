use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
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

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Event delivery is best-effort; it never blocks a request outcome.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

// The various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    ProductStockToggled { product_id: Uuid, in_stock: bool },

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Checkout events
    CheckoutSessionCreated {
        order_id: Option<Uuid>,
        line_count: usize,
    },

    // File events
    FileStored(Uuid),
    FileRemoved(Uuid),
}

/// Event processing loop. Consumes domain events and logs them; downstream
/// consumers (fulfillment, notifications) would hang off this task.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::CheckoutSessionCreated {
                order_id,
                line_count,
            } => {
                info!(?order_id, line_count, "checkout session created");
            }
            other => info!("Received event: {:?}", other),
        }
    }

    info!("Event channel closed; stopping event processing loop");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        assert!(matches!(rx.recv().await, Some(Event::OrderCreated(_))));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out.
        sender.send_or_log(Event::FileStored(Uuid::new_v4())).await;
    }
}
