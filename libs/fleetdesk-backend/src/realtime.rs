//! Table change notifications.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change on a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub id: Option<Uuid>,
}

/// Live subscription to one table. Dropping it releases the listener.
pub struct ChangeSubscription {
    table: String,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Next change, or `None` once the publisher is gone.
    ///
    /// A lagging subscriber skips the events it missed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(table = %self.table, skipped, "change subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Per-table broadcast channels.
#[derive(Default)]
pub struct ChangeHub {
    channels: DashMap<String, broadcast::Sender<ChangeEvent>>,
}

impl ChangeHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, table: &str) -> broadcast::Sender<ChangeEvent> {
        self.channels
            .entry(table.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    #[must_use]
    pub fn subscribe(&self, table: &str) -> ChangeSubscription {
        ChangeSubscription {
            table: table.to_owned(),
            rx: self.sender(table).subscribe(),
        }
    }

    /// Deliver an event to current listeners of its table.
    pub fn publish(&self, event: ChangeEvent) {
        let Some(tx) = self.channels.get(&event.table).map(|tx| tx.clone()) else {
            return;
        };
        // No receivers is not an error here.
        let delivered = tx.send(event).unwrap_or(0);
        tracing::trace!(delivered, "published change event");
    }

    #[must_use]
    pub fn listener_count(&self, table: &str) -> usize {
        self.channels
            .get(table)
            .map_or(0, |tx| tx.receiver_count())
    }
}
