use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::OrderStatus;

/// Buffer size of each per-table broadcast channel.
const CHANGE_FEED_CAPACITY: usize = 64;

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

    /// Sends an event, logging instead of failing when nobody is listening.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Domain events emitted after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        user_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderDeleted(Uuid),
    CategoryCreated(Uuid),
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    StoreSettingUpdated(String),
}

impl Event {
    /// Tables whose contents the event changed.
    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            Event::OrderCreated { .. } | Event::OrderDeleted(_) => {
                &["orders", "order_items", "order_item_addons"]
            }
            Event::OrderStatusChanged { .. } => &["orders"],
            Event::CategoryCreated(_) => &["categories"],
            Event::ProductCreated(_) | Event::ProductUpdated(_) | Event::ProductDeleted(_) => {
                &["products", "product_variants", "product_addons", "variant_addons"]
            }
            Event::StoreSettingUpdated(_) => &["store_settings"],
        }
    }
}

/// "Something changed, re-fetch" signal delivered to feed subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableChange {
    pub table: String,
    pub at: DateTime<Utc>,
}

/// Table-keyed pub/sub used by staff dashboards to stay fresh. Nothing in the
/// write path depends on it.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    channels: DashMap<String, broadcast::Sender<TableChange>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table: &str) -> broadcast::Receiver<TableChange> {
        self.channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_FEED_CAPACITY).0)
            .subscribe()
    }

    /// Drops the channel for `table`; existing receivers observe it as closed.
    pub fn unsubscribe(&self, table: &str) {
        self.channels.remove(table);
    }

    /// Notifies subscribers of `table`. Returns how many receivers got the signal.
    pub fn publish(&self, table: &str) -> usize {
        let Some(sender) = self.channels.get(table) else {
            return 0;
        };
        let change = TableChange {
            table: table.to_string(),
            at: Utc::now(),
        };
        sender.send(change).unwrap_or(0)
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.channels
            .get(table)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Drains domain events and fans them out to the change feed.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, feed: Arc<ChangeFeed>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);

        for table in event.tables() {
            let delivered = feed.publish(table);
            debug!(table = %table, delivered, "Published table change");
        }
    }

    info!("Event channel closed, stopping event processing loop");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_table_subscribers_only() {
        let feed = ChangeFeed::new();
        let mut orders = feed.subscribe("orders");
        let mut settings = feed.subscribe("store_settings");

        assert_eq!(feed.publish("orders"), 1);
        assert_eq!(orders.recv().await.unwrap().table, "orders");
        assert!(settings.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_closes_receivers() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe("orders");
        feed.unsubscribe("orders");

        assert_eq!(feed.publish("orders"), 0);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn process_events_translates_to_table_changes() {
        let feed = Arc::new(ChangeFeed::new());
        let mut items = feed.subscribe("order_items");
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(process_events(rx, feed.clone()));

        let sender = EventSender::new(tx);
        sender
            .send_or_log(Event::OrderCreated {
                order_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            })
            .await;

        let change = items.recv().await.unwrap();
        assert_eq!(change.table, "order_items");

        drop(sender);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender.send_or_log(Event::OrderDeleted(Uuid::new_v4())).await;
        assert!(sender.send(Event::OrderDeleted(Uuid::new_v4())).await.is_err());
    }
}
