//! Public API trait of the inventory module.

use async_trait::async_trait;
use fleetdesk_query::{Page, PageRequest};
use fleetdesk_security::SecurityContext;
use uuid::Uuid;

use crate::error::InventoryError;
use crate::filters::{ClientFilter, EquipmentFilter, LicenseFilter};
use crate::models::{Client, Equipment, License, NewClient, NewEquipment, NewLicense};
use crate::stats::{ClientStats, Dashboard, EquipmentStats, LicenseStats};

/// Permission-scoped access to clients, licenses and equipment.
///
/// Every call narrows to what `ctx` may see. A caller that may see nothing
/// gets empty results rather than an error; only writes report
/// [`InventoryError::Forbidden`].
///
/// ```ignore
/// let page = inventory
///     .list_licenses(&ctx, &LicenseFilter::default().status("active"), PageRequest::new(1, 10))
///     .await?;
/// let dashboard = inventory.dashboard(&ctx).await?;
/// ```
#[async_trait]
pub trait InventoryClientV1: Send + Sync {
    async fn list_clients(
        &self,
        ctx: &SecurityContext,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> Result<Page<Client>, InventoryError>;

    /// # Errors
    ///
    /// - `NotFound` when the client does not exist or is outside the caller's scope
    async fn get_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<Client, InventoryError>;

    async fn create_client(
        &self,
        ctx: &SecurityContext,
        client: NewClient,
    ) -> Result<Client, InventoryError>;

    async fn delete_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), InventoryError>;

    async fn list_licenses(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
        page: PageRequest,
    ) -> Result<Page<License>, InventoryError>;

    async fn get_license(&self, ctx: &SecurityContext, id: Uuid)
    -> Result<License, InventoryError>;

    async fn create_license(
        &self,
        ctx: &SecurityContext,
        license: NewLicense,
    ) -> Result<License, InventoryError>;

    async fn delete_license(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), InventoryError>;

    async fn list_equipment(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
        page: PageRequest,
    ) -> Result<Page<Equipment>, InventoryError>;

    async fn get_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Equipment, InventoryError>;

    async fn create_equipment(
        &self,
        ctx: &SecurityContext,
        equipment: NewEquipment,
    ) -> Result<Equipment, InventoryError>;

    async fn delete_equipment(&self, ctx: &SecurityContext, id: Uuid)
    -> Result<(), InventoryError>;

    /// Aggregates over every license in scope that matches `filter`.
    async fn license_stats(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
    ) -> Result<LicenseStats, InventoryError>;

    async fn equipment_stats(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
    ) -> Result<EquipmentStats, InventoryError>;

    async fn client_stats(&self, ctx: &SecurityContext) -> Result<ClientStats, InventoryError>;

    /// Never fails because one section failed; see [`Dashboard::degraded`].
    async fn dashboard(&self, ctx: &SecurityContext) -> Result<Dashboard, InventoryError>;
}
