//! In-process client for the inventory module.

use std::sync::Arc;

use async_trait::async_trait;
use fleetdesk_query::{Page, PageRequest};
use fleetdesk_security::SecurityContext;
use inventory_sdk::{
    Client, ClientFilter, ClientStats, Dashboard, Equipment, EquipmentFilter, EquipmentStats,
    InventoryClientV1, InventoryError, License, LicenseFilter, LicenseStats, NewClient,
    NewEquipment, NewLicense,
};
use uuid::Uuid;

use super::{DomainError, Service};

/// Local client wrapping the inventory service.
pub struct InventoryLocalClient {
    svc: Arc<Service>,
}

impl InventoryLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> InventoryError {
    tracing::error!(operation = op, error = ?e, "inventory call failed");
    e.into()
}

#[async_trait]
impl InventoryClientV1 for InventoryLocalClient {
    async fn list_clients(
        &self,
        ctx: &SecurityContext,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> Result<Page<Client>, InventoryError> {
        self.svc
            .list_clients(ctx, filter, page)
            .await
            .map_err(|e| log_and_convert("list_clients", e))
    }

    async fn get_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<Client, InventoryError> {
        self.svc
            .get_client(ctx, id)
            .await
            .map_err(|e| log_and_convert("get_client", e))
    }

    async fn create_client(
        &self,
        ctx: &SecurityContext,
        client: NewClient,
    ) -> Result<Client, InventoryError> {
        self.svc
            .create_client(ctx, &client)
            .await
            .map_err(|e| log_and_convert("create_client", e))
    }

    async fn delete_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), InventoryError> {
        self.svc
            .delete_client(ctx, id)
            .await
            .map_err(|e| log_and_convert("delete_client", e))
    }

    async fn list_licenses(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
        page: PageRequest,
    ) -> Result<Page<License>, InventoryError> {
        self.svc
            .list_licenses(ctx, filter, page)
            .await
            .map_err(|e| log_and_convert("list_licenses", e))
    }

    async fn get_license(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<License, InventoryError> {
        self.svc
            .get_license(ctx, id)
            .await
            .map_err(|e| log_and_convert("get_license", e))
    }

    async fn create_license(
        &self,
        ctx: &SecurityContext,
        license: NewLicense,
    ) -> Result<License, InventoryError> {
        self.svc
            .create_license(ctx, &license)
            .await
            .map_err(|e| log_and_convert("create_license", e))
    }

    async fn delete_license(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), InventoryError> {
        self.svc
            .delete_license(ctx, id)
            .await
            .map_err(|e| log_and_convert("delete_license", e))
    }

    async fn list_equipment(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
        page: PageRequest,
    ) -> Result<Page<Equipment>, InventoryError> {
        self.svc
            .list_equipment(ctx, filter, page)
            .await
            .map_err(|e| log_and_convert("list_equipment", e))
    }

    async fn get_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Equipment, InventoryError> {
        self.svc
            .get_equipment(ctx, id)
            .await
            .map_err(|e| log_and_convert("get_equipment", e))
    }

    async fn create_equipment(
        &self,
        ctx: &SecurityContext,
        equipment: NewEquipment,
    ) -> Result<Equipment, InventoryError> {
        self.svc
            .create_equipment(ctx, &equipment)
            .await
            .map_err(|e| log_and_convert("create_equipment", e))
    }

    async fn delete_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<(), InventoryError> {
        self.svc
            .delete_equipment(ctx, id)
            .await
            .map_err(|e| log_and_convert("delete_equipment", e))
    }

    async fn license_stats(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
    ) -> Result<LicenseStats, InventoryError> {
        self.svc
            .license_stats(ctx, filter)
            .await
            .map_err(|e| log_and_convert("license_stats", e))
    }

    async fn equipment_stats(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
    ) -> Result<EquipmentStats, InventoryError> {
        self.svc
            .equipment_stats(ctx, filter)
            .await
            .map_err(|e| log_and_convert("equipment_stats", e))
    }

    async fn client_stats(&self, ctx: &SecurityContext) -> Result<ClientStats, InventoryError> {
        self.svc
            .client_stats(ctx)
            .await
            .map_err(|e| log_and_convert("client_stats", e))
    }

    async fn dashboard(&self, ctx: &SecurityContext) -> Result<Dashboard, InventoryError> {
        self.svc
            .dashboard(ctx)
            .await
            .map_err(|e| log_and_convert("dashboard", e))
    }
}
