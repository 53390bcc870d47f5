//! Wiring of the inventory module.

use std::sync::Arc;
use std::time::Duration;

use fleetdesk_backend::DataBackendRef;
use fleetdesk_security::PermissionResolver;
use inventory_sdk::InventoryClientV1;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cached_client::CachedInventoryClient;
use crate::config::InventoryConfig;
use crate::domain::{InventoryLocalClient, Service};
use crate::realtime::RealtimeForwarder;

const MIN_GC_PERIOD: Duration = Duration::from_secs(1);

/// Inventory module.
///
/// Builds the scoped service, wraps it in the local client and puts the
/// read-through cache in front. Consumers use [`InventoryModule::client`].
pub struct InventoryModule {
    data: DataBackendRef,
    service: Arc<Service>,
    cached: Arc<CachedInventoryClient>,
}

impl InventoryModule {
    #[must_use]
    pub fn new(
        data: DataBackendRef,
        resolver: Arc<PermissionResolver>,
        config: InventoryConfig,
    ) -> Self {
        Self::with_service(Service::new(Arc::clone(&data), resolver, config), data)
    }

    /// Use a preconfigured service, e.g. one with a fixed clock.
    #[must_use]
    pub fn with_service(service: Service, data: DataBackendRef) -> Self {
        let policy = service.config().cache.clone();
        let resolver = Arc::clone(service.resolver());
        let service = Arc::new(service);
        let local: Arc<dyn InventoryClientV1> =
            Arc::new(InventoryLocalClient::new(Arc::clone(&service)));
        let cached = Arc::new(CachedInventoryClient::new(local, resolver, policy));
        info!(
            stale_window = ?service.config().cache.stale_window,
            "inventory module initialized"
        );
        Self {
            data,
            service,
            cached,
        }
    }

    /// Cached, permission-scoped client.
    #[must_use]
    pub fn client(&self) -> Arc<dyn InventoryClientV1> {
        Arc::clone(&self.cached) as Arc<dyn InventoryClientV1>
    }

    #[must_use]
    pub fn cached(&self) -> &Arc<CachedInventoryClient> {
        &self.cached
    }

    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Invalidate cached reads whenever the backend reports a row change.
    /// Keep the returned handle alive for as long as forwarding should run.
    #[must_use]
    pub fn start_realtime(&self) -> RealtimeForwarder {
        self.cached
            .forward_changes(&self.data, &self.service.config().relations)
    }

    /// Evict idle cache entries in the background until `cancel` fires.
    /// Sweeps every half gc window, so an idle entry is gone at most 1.5
    /// windows after its last read.
    #[must_use]
    pub fn start_gc(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let period = gc_period(self.service.config().cache.gc_window);
        info!(?period, "starting cache gc");
        self.cached.cache().spawn_gc(period, cancel)
    }
}

fn gc_period(gc_window: Duration) -> Duration {
    (gc_window / 2).max(MIN_GC_PERIOD)
}
