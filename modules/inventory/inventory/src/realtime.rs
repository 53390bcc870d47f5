//! Forwarding of backend row changes into cache invalidation.

use fleetdesk_backend::{ChangeSubscription, DataBackendRef};
use fleetdesk_cache::QueryCache;
use inventory_sdk::InventoryError;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::cached_client::kinds;
use crate::config::Relations;

/// One subscription per table; each event marks the cached kinds fed by
/// that table as stale.
///
/// Dropping the forwarder aborts its tasks, which drops the subscriptions
/// and releases the backend listeners.
#[derive(Debug)]
pub struct RealtimeForwarder {
    tasks: Vec<JoinHandle<()>>,
}

impl RealtimeForwarder {
    /// Subscribe to the clients, licenses and equipment tables.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(
        data: &DataBackendRef,
        relations: &Relations,
        cache: &QueryCache<InventoryError>,
    ) -> Self {
        let routes = [
            (relations.clients_table.as_str(), kinds::CLIENTS),
            (relations.licenses_table.as_str(), kinds::LICENSES),
            (relations.equipment_table.as_str(), kinds::EQUIPMENT),
        ];
        let tasks = routes
            .into_iter()
            .map(|(table, kind)| {
                let subscription = data.subscribe(table);
                tokio::spawn(forward(subscription, kind, cache.clone()))
            })
            .collect();
        Self { tasks }
    }

    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for RealtimeForwarder {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn forward(
    mut subscription: ChangeSubscription,
    kind: &'static str,
    cache: QueryCache<InventoryError>,
) {
    while let Some(event) = subscription.recv().await {
        let stale = cache.invalidate(kind) + cache.invalidate(kinds::DASHBOARD);
        debug!(
            table = %event.table,
            change = ?event.kind,
            id = ?event.id,
            stale,
            "row change; cache entries marked stale"
        );
    }
    trace!(table = subscription.table(), "change stream closed");
}
