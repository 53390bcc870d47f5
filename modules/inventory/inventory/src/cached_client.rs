//! Read-through caching in front of any [`InventoryClientV1`].
//!
//! Reads are keyed by entity kind, the caller's capabilities, the filter and
//! the page, so callers with identical visibility share entries and in-flight
//! requests. Writes go straight through and mark the affected kinds stale.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use fleetdesk_backend::DataBackendRef;
use fleetdesk_cache::{CachePolicy, QueryCache, QueryKey, RefetchTrigger};
use fleetdesk_query::{Page, PageRequest};
use fleetdesk_security::{PermissionResolver, SecurityContext};
use inventory_sdk::{
    Client, ClientFilter, ClientStats, Dashboard, Equipment, EquipmentFilter, EquipmentStats,
    InventoryClientV1, InventoryError, License, LicenseFilter, LicenseStats, NewClient,
    NewEquipment, NewLicense,
};
use uuid::Uuid;

use crate::config::Relations;
use crate::realtime::RealtimeForwarder;

/// Cache kinds; one per entity plus the dashboard, which depends on all three.
pub mod kinds {
    pub const CLIENTS: &str = "clients";
    pub const LICENSES: &str = "licenses";
    pub const EQUIPMENT: &str = "equipment";
    pub const DASHBOARD: &str = "dashboard";
}

pub struct CachedInventoryClient {
    inner: Arc<dyn InventoryClientV1>,
    resolver: Arc<PermissionResolver>,
    cache: QueryCache<InventoryError>,
}

impl CachedInventoryClient {
    #[must_use]
    pub fn new(
        inner: Arc<dyn InventoryClientV1>,
        resolver: Arc<PermissionResolver>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            inner,
            resolver,
            cache: QueryCache::new(policy, InventoryError::is_retryable),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache<InventoryError> {
        &self.cache
    }

    /// Start invalidating this client's entries on backend row changes.
    #[must_use]
    pub fn forward_changes(&self, data: &DataBackendRef, relations: &Relations) -> RealtimeForwarder {
        RealtimeForwarder::spawn(data, relations, &self.cache)
    }

    /// Window focus or network reconnect; refetches stale entries when the
    /// trigger is enabled by the policy.
    pub fn notify(&self, trigger: RefetchTrigger) -> usize {
        self.cache.notify(trigger)
    }

    fn key(&self, ctx: &SecurityContext, kind: &str, op: &str) -> QueryKey {
        let caps = self.resolver.resolve(ctx);
        QueryKey::new(kind).with(op).with(&*caps)
    }

    async fn read<T, F, Fut>(
        &self,
        key: QueryKey,
        ctx: &SecurityContext,
        call: F,
    ) -> Result<T, InventoryError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Arc<dyn InventoryClientV1>, SecurityContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, InventoryError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let ctx = ctx.clone();
        let result = self
            .cache
            .fetch(key, move || call(Arc::clone(&inner), ctx.clone()))
            .await?;
        Ok(T::clone(&result.data))
    }

    fn written(&self, changed: &[&str]) {
        for kind in changed {
            self.cache.invalidate(kind);
        }
        self.cache.invalidate(kinds::DASHBOARD);
    }
}

#[async_trait]
impl InventoryClientV1 for CachedInventoryClient {
    async fn list_clients(
        &self,
        ctx: &SecurityContext,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> Result<Page<Client>, InventoryError> {
        let key = self.key(ctx, kinds::CLIENTS, "list").with(filter).with(&page);
        let filter = filter.clone();
        self.read(key, ctx, move |inner, ctx| {
            let filter = filter.clone();
            async move { inner.list_clients(&ctx, &filter, page).await }
        })
        .await
    }

    async fn get_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<Client, InventoryError> {
        let key = self.key(ctx, kinds::CLIENTS, "get").with(&id);
        self.read(key, ctx, move |inner, ctx| async move {
            inner.get_client(&ctx, id).await
        })
        .await
    }

    async fn create_client(
        &self,
        ctx: &SecurityContext,
        client: NewClient,
    ) -> Result<Client, InventoryError> {
        let created = self.inner.create_client(ctx, client).await?;
        self.written(&[kinds::CLIENTS]);
        Ok(created)
    }

    async fn delete_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), InventoryError> {
        self.inner.delete_client(ctx, id).await?;
        self.written(&[kinds::CLIENTS, kinds::LICENSES, kinds::EQUIPMENT]);
        Ok(())
    }

    async fn list_licenses(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
        page: PageRequest,
    ) -> Result<Page<License>, InventoryError> {
        let key = self.key(ctx, kinds::LICENSES, "list").with(filter).with(&page);
        let filter = filter.clone();
        self.read(key, ctx, move |inner, ctx| {
            let filter = filter.clone();
            async move { inner.list_licenses(&ctx, &filter, page).await }
        })
        .await
    }

    async fn get_license(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<License, InventoryError> {
        let key = self.key(ctx, kinds::LICENSES, "get").with(&id);
        self.read(key, ctx, move |inner, ctx| async move {
            inner.get_license(&ctx, id).await
        })
        .await
    }

    async fn create_license(
        &self,
        ctx: &SecurityContext,
        license: NewLicense,
    ) -> Result<License, InventoryError> {
        let created = self.inner.create_license(ctx, license).await?;
        self.written(&[kinds::LICENSES]);
        Ok(created)
    }

    async fn delete_license(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), InventoryError> {
        self.inner.delete_license(ctx, id).await?;
        self.written(&[kinds::LICENSES]);
        Ok(())
    }

    async fn list_equipment(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
        page: PageRequest,
    ) -> Result<Page<Equipment>, InventoryError> {
        let key = self.key(ctx, kinds::EQUIPMENT, "list").with(filter).with(&page);
        let filter = filter.clone();
        self.read(key, ctx, move |inner, ctx| {
            let filter = filter.clone();
            async move { inner.list_equipment(&ctx, &filter, page).await }
        })
        .await
    }

    async fn get_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Equipment, InventoryError> {
        let key = self.key(ctx, kinds::EQUIPMENT, "get").with(&id);
        self.read(key, ctx, move |inner, ctx| async move {
            inner.get_equipment(&ctx, id).await
        })
        .await
    }

    async fn create_equipment(
        &self,
        ctx: &SecurityContext,
        equipment: NewEquipment,
    ) -> Result<Equipment, InventoryError> {
        let created = self.inner.create_equipment(ctx, equipment).await?;
        self.written(&[kinds::EQUIPMENT]);
        Ok(created)
    }

    async fn delete_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<(), InventoryError> {
        self.inner.delete_equipment(ctx, id).await?;
        self.written(&[kinds::EQUIPMENT]);
        Ok(())
    }

    async fn license_stats(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
    ) -> Result<LicenseStats, InventoryError> {
        let key = self.key(ctx, kinds::LICENSES, "stats").with(filter);
        let filter = filter.clone();
        self.read(key, ctx, move |inner, ctx| {
            let filter = filter.clone();
            async move { inner.license_stats(&ctx, &filter).await }
        })
        .await
    }

    async fn equipment_stats(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
    ) -> Result<EquipmentStats, InventoryError> {
        let key = self.key(ctx, kinds::EQUIPMENT, "stats").with(filter);
        let filter = filter.clone();
        self.read(key, ctx, move |inner, ctx| {
            let filter = filter.clone();
            async move { inner.equipment_stats(&ctx, &filter).await }
        })
        .await
    }

    async fn client_stats(&self, ctx: &SecurityContext) -> Result<ClientStats, InventoryError> {
        let key = self.key(ctx, kinds::CLIENTS, "stats");
        self.read(key, ctx, |inner, ctx| async move { inner.client_stats(&ctx).await })
            .await
    }

    async fn dashboard(&self, ctx: &SecurityContext) -> Result<Dashboard, InventoryError> {
        let key = self.key(ctx, kinds::DASHBOARD, "summary");
        self.read(key, ctx, |inner, ctx| async move { inner.dashboard(&ctx).await })
            .await
    }
}
