use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use fleetdesk_backend::{BackendError, DataBackendRef, Row};
use fleetdesk_query::ast::Expr;
use fleetdesk_query::{
    CountMode, NullsOrder, Page, PageRequest, QueryBuilder, Schema, SelectQuery, SortDir,
};
use fleetdesk_sdk::ItemsPager;
use fleetdesk_security::{AccessScope, Action, PermissionResolver, Resource, SecurityContext};
use futures_util::TryStreamExt;
use inventory_sdk::schema::{
    ClientSchema, EquipmentSchema, LicenseSchema, client, equipment, license,
};
use inventory_sdk::{
    Client, ClientFilter, ClientStats, Dashboard, DashboardSection, Equipment, EquipmentFilter,
    EquipmentStats, EquipmentStatus, EquipmentType, License, LicenseFilter, LicenseStats,
    LicenseStatus, NewClient, NewEquipment, NewLicense, UnknownValue,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::error::DomainError;
use super::stats;
use crate::config::InventoryConfig;

const CLIENT: &str = "client";
const LICENSE: &str = "license";
const EQUIPMENT: &str = "equipment";

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// What a caller may read from one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Nothing,
    All,
    Owner(Uuid),
}

impl Visibility {
    fn owner(self) -> Option<Uuid> {
        match self {
            Visibility::Owner(id) => Some(id),
            Visibility::Nothing | Visibility::All => None,
        }
    }
}

/// Permission-scoped reads, writes and aggregates over the inventory views.
///
/// A restricted caller's owner filter is always the first predicate of every
/// query; callers that may see nothing never reach the backend.
pub struct Service {
    data: DataBackendRef,
    resolver: Arc<PermissionResolver>,
    config: InventoryConfig,
    today: Today,
}

impl Service {
    #[must_use]
    pub fn new(
        data: DataBackendRef,
        resolver: Arc<PermissionResolver>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            data,
            resolver,
            config,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the clock used for the expiry histogram.
    #[must_use]
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    #[must_use]
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    fn visibility(&self, ctx: &SecurityContext, resource: Resource) -> Visibility {
        let caps = self.resolver.resolve(ctx);
        if !caps.is_authenticated() || !caps.can(Action::View, resource) {
            return Visibility::Nothing;
        }
        let scope = caps.scope();
        if scope.can_view_all() {
            Visibility::All
        } else {
            scope.owner_filter().map_or(Visibility::Nothing, Visibility::Owner)
        }
    }

    fn authorize_write(
        &self,
        ctx: &SecurityContext,
        resource: Resource,
        action: Action,
    ) -> Result<AccessScope, DomainError> {
        let caps = self.resolver.resolve(ctx);
        if !caps.is_authenticated() {
            return Err(DomainError::Unauthenticated);
        }
        let scope = caps.scope();
        if !caps.can(action, resource) || scope.is_denied() {
            return Err(DomainError::Forbidden {
                resource: resource.as_str(),
                action: action.as_str(),
            });
        }
        Ok(scope.clone())
    }

    // ---- clients ----

    /// # Errors
    /// `Validation` for an out-of-range page request, `Backend` when the select fails.
    #[instrument(skip_all, fields(page = request.page, limit = request.limit))]
    pub async fn list_clients(
        &self,
        ctx: &SecurityContext,
        filter: &ClientFilter,
        request: PageRequest,
    ) -> Result<Page<Client>, DomainError> {
        self.config.limits.validate(request)?;
        let vis = self.visibility(ctx, Resource::Clients);
        if vis == Visibility::Nothing {
            debug!("no client visibility; returning empty page");
            return Ok(Page::empty(request));
        }
        let query = paged(client_query(vis.owner(), filter), request);
        self.select_page(ctx, CLIENT, &self.config.relations.clients_view, query, request)
            .await
    }

    /// # Errors
    /// `NotFound` when the client does not exist or is outside the caller's scope.
    #[instrument(skip(self, ctx))]
    pub async fn get_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<Client, DomainError> {
        let vis = self.visibility(ctx, Resource::Clients);
        let owner = vis.owner().map(|owner| client::ID.eq(owner));
        self.get_one(ctx, CLIENT, vis, &self.config.relations.clients_view, id, owner)
            .await
    }

    /// # Errors
    /// `Forbidden` without create permission, `Validation` for an empty name.
    #[instrument(skip_all)]
    pub async fn create_client(
        &self,
        ctx: &SecurityContext,
        new: &NewClient,
    ) -> Result<Client, DomainError> {
        let scope = self.authorize_write(ctx, Resource::Clients, Action::Create)?;
        if !scope.can_view_all() {
            return Err(DomainError::Forbidden {
                resource: Resource::Clients.as_str(),
                action: Action::Create.as_str(),
            });
        }
        require_name(&new.name)?;
        self.insert_row(ctx, CLIENT, &self.config.relations.clients_table, new)
            .await
    }

    /// # Errors
    /// `Forbidden` without delete permission, `NotFound` for an unknown id.
    #[instrument(skip(self, ctx))]
    pub async fn delete_client(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        let scope = self.authorize_write(ctx, Resource::Clients, Action::Delete)?;
        let owner = scope.owner_filter().map(|owner| client::ID.eq(owner));
        let relations = &self.config.relations;
        let target = (relations.clients_table.as_str(), relations.clients_view.as_str());
        self.delete_row(ctx, CLIENT, target, id, owner).await
    }

    // ---- licenses ----

    /// # Errors
    /// `Validation` for an out-of-range page request, `Backend` when the select fails.
    #[instrument(skip_all, fields(page = request.page, limit = request.limit))]
    pub async fn list_licenses(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
        request: PageRequest,
    ) -> Result<Page<License>, DomainError> {
        self.config.limits.validate(request)?;
        let vis = self.visibility(ctx, Resource::Licenses);
        if vis == Visibility::Nothing {
            debug!("no license visibility; returning empty page");
            return Ok(Page::empty(request));
        }
        let query = paged(license_query(vis.owner(), filter), request);
        self.select_page(ctx, LICENSE, &self.config.relations.licenses_view, query, request)
            .await
    }

    /// # Errors
    /// `NotFound` when the license does not exist or is outside the caller's scope.
    #[instrument(skip(self, ctx))]
    pub async fn get_license(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<License, DomainError> {
        let vis = self.visibility(ctx, Resource::Licenses);
        let owner = vis.owner().map(|owner| license::CLIENT_ID.eq(owner));
        self.get_one(ctx, LICENSE, vis, &self.config.relations.licenses_view, id, owner)
            .await
    }

    /// # Errors
    /// `Forbidden` without create permission or for another owner's client,
    /// `Validation` for an empty name.
    #[instrument(skip_all)]
    pub async fn create_license(
        &self,
        ctx: &SecurityContext,
        new: &NewLicense,
    ) -> Result<License, DomainError> {
        let scope = self.authorize_write(ctx, Resource::Licenses, Action::Create)?;
        check_owner(&scope, new.client_id, Resource::Licenses)?;
        require_name(&new.name)?;
        self.insert_row(ctx, LICENSE, &self.config.relations.licenses_table, new)
            .await
    }

    /// # Errors
    /// `Forbidden` without delete permission, `NotFound` for an unknown or foreign id.
    #[instrument(skip(self, ctx))]
    pub async fn delete_license(&self, ctx: &SecurityContext, id: Uuid) -> Result<(), DomainError> {
        let scope = self.authorize_write(ctx, Resource::Licenses, Action::Delete)?;
        let owner = scope.owner_filter().map(|owner| license::CLIENT_ID.eq(owner));
        let relations = &self.config.relations;
        let target = (relations.licenses_table.as_str(), relations.licenses_view.as_str());
        self.delete_row(ctx, LICENSE, target, id, owner).await
    }

    // ---- equipment ----

    /// # Errors
    /// `Validation` for an out-of-range page request, `Backend` when the select fails.
    #[instrument(skip_all, fields(page = request.page, limit = request.limit))]
    pub async fn list_equipment(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
        request: PageRequest,
    ) -> Result<Page<Equipment>, DomainError> {
        self.config.limits.validate(request)?;
        let vis = self.visibility(ctx, Resource::Equipment);
        if vis == Visibility::Nothing {
            debug!("no equipment visibility; returning empty page");
            return Ok(Page::empty(request));
        }
        let query = paged(equipment_query(vis.owner(), filter), request);
        self.select_page(ctx, EQUIPMENT, &self.config.relations.equipment_view, query, request)
            .await
    }

    /// # Errors
    /// `NotFound` when the equipment does not exist or is outside the caller's scope.
    #[instrument(skip(self, ctx))]
    pub async fn get_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<Equipment, DomainError> {
        let vis = self.visibility(ctx, Resource::Equipment);
        let owner = vis.owner().map(|owner| equipment::CLIENT_ID.eq(owner));
        self.get_one(ctx, EQUIPMENT, vis, &self.config.relations.equipment_view, id, owner)
            .await
    }

    /// # Errors
    /// `Forbidden` without create permission or for another owner's client,
    /// `Validation` for an empty name.
    #[instrument(skip_all)]
    pub async fn create_equipment(
        &self,
        ctx: &SecurityContext,
        new: &NewEquipment,
    ) -> Result<Equipment, DomainError> {
        let scope = self.authorize_write(ctx, Resource::Equipment, Action::Create)?;
        check_owner(&scope, new.client_id, Resource::Equipment)?;
        require_name(&new.name)?;
        self.insert_row(ctx, EQUIPMENT, &self.config.relations.equipment_table, new)
            .await
    }

    /// # Errors
    /// `Forbidden` without delete permission, `NotFound` for an unknown or foreign id.
    #[instrument(skip(self, ctx))]
    pub async fn delete_equipment(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<(), DomainError> {
        let scope = self.authorize_write(ctx, Resource::Equipment, Action::Delete)?;
        let owner = scope.owner_filter().map(|owner| equipment::CLIENT_ID.eq(owner));
        let relations = &self.config.relations;
        self.delete_row(
            ctx,
            EQUIPMENT,
            (relations.equipment_table.as_str(), relations.equipment_view.as_str()),
            id,
            owner,
        )
        .await
    }

    // ---- aggregates ----

    /// # Errors
    /// `Backend` when any batch of the scan fails.
    #[instrument(skip_all)]
    pub async fn license_stats(
        &self,
        ctx: &SecurityContext,
        filter: &LicenseFilter,
    ) -> Result<LicenseStats, DomainError> {
        let today = (self.today)();
        let vis = self.visibility(ctx, Resource::Licenses);
        if vis == Visibility::Nothing {
            return Ok(stats::empty_license_stats(today));
        }
        let base = license_query(vis.owner(), filter).build();
        let rows: Vec<License> = self
            .scan(ctx, LICENSE, &self.config.relations.licenses_view, &base)
            .await?;
        Ok(stats::license_stats(&rows, today))
    }

    /// # Errors
    /// `Backend` when any batch of the scan fails.
    #[instrument(skip_all)]
    pub async fn equipment_stats(
        &self,
        ctx: &SecurityContext,
        filter: &EquipmentFilter,
    ) -> Result<EquipmentStats, DomainError> {
        let vis = self.visibility(ctx, Resource::Equipment);
        if vis == Visibility::Nothing {
            return Ok(EquipmentStats::default());
        }
        let base = equipment_query(vis.owner(), filter).build();
        let rows: Vec<Equipment> = self
            .scan(ctx, EQUIPMENT, &self.config.relations.equipment_view, &base)
            .await?;
        Ok(stats::equipment_stats(&rows))
    }

    /// Only the exact count is fetched; no rows are decoded beyond the first.
    ///
    /// # Errors
    /// `Backend` when the count query fails.
    #[instrument(skip_all)]
    pub async fn client_stats(&self, ctx: &SecurityContext) -> Result<ClientStats, DomainError> {
        let vis = self.visibility(ctx, Resource::Clients);
        if vis == Visibility::Nothing {
            return Ok(ClientStats::default());
        }
        let request = PageRequest::new(1, 1);
        let query = paged(client_query(vis.owner(), &ClientFilter::default()), request);
        let page: Page<Client> = self
            .select_page(ctx, CLIENT, &self.config.relations.clients_view, query, request)
            .await?;
        Ok(stats::client_stats(page.total_count))
    }

    /// Runs the three aggregates concurrently. A failed section is zeroed
    /// and listed in [`Dashboard::degraded`].
    ///
    /// # Errors
    /// Only authentication failures propagate.
    #[instrument(skip_all)]
    pub async fn dashboard(&self, ctx: &SecurityContext) -> Result<Dashboard, DomainError> {
        let license_filter = LicenseFilter::default();
        let equipment_filter = EquipmentFilter::default();
        let (clients, licenses, equipment) = tokio::join!(
            self.client_stats(ctx),
            self.license_stats(ctx, &license_filter),
            self.equipment_stats(ctx, &equipment_filter),
        );

        let mut degraded = Vec::new();
        let clients = degrade(DashboardSection::Clients, clients, &mut degraded)?
            .unwrap_or_default();
        let licenses = degrade(DashboardSection::Licenses, licenses, &mut degraded)?
            .unwrap_or_else(|| stats::empty_license_stats((self.today)()));
        let equipment = degrade(DashboardSection::Equipment, equipment, &mut degraded)?
            .unwrap_or_default();

        Ok(Dashboard {
            clients,
            licenses,
            equipment,
            degraded,
        })
    }

    // ---- plumbing ----

    async fn select_page<T: DeserializeOwned>(
        &self,
        ctx: &SecurityContext,
        entity: &'static str,
        view: &str,
        query: SelectQuery,
        request: PageRequest,
    ) -> Result<Page<T>, DomainError> {
        let result = self.data.select(ctx, view, &query).await?;
        let fetched = result.rows.len();
        let Some(total) = result.total_count else {
            return Err(DomainError::Decode {
                entity,
                message: format!("{view}: backend did not report an exact row count"),
            });
        };
        let items = decode_rows(entity, result.rows)?;
        debug!(view, fetched, total, "selected page");
        Ok(Page::new(items, total, request))
    }

    /// Every row matching `base`, fetched in `stats_batch_size` batches.
    async fn scan<T: DeserializeOwned>(
        &self,
        ctx: &SecurityContext,
        entity: &'static str,
        view: &str,
        base: &SelectQuery,
    ) -> Result<Vec<T>, DomainError> {
        let this = self;
        ItemsPager::new(self.config.stats_batch_size, move |request: PageRequest| {
            let query = base
                .clone()
                .with_range(request.range())
                .with_count(CountMode::Exact);
            this.select_page::<T>(ctx, entity, view, query, request)
        })
        .try_collect()
        .await
    }

    async fn get_one<T: DeserializeOwned>(
        &self,
        ctx: &SecurityContext,
        entity: &'static str,
        vis: Visibility,
        view: &str,
        id: Uuid,
        owner: Option<Expr>,
    ) -> Result<T, DomainError> {
        if vis == Visibility::Nothing {
            return Err(DomainError::NotFound { entity, id });
        }
        let row = self
            .data
            .select_by_id(ctx, view, id, owner.into_iter().collect())
            .await?;
        match row.filter(has_id) {
            Some(row) => decode(entity, row),
            None => Err(DomainError::NotFound { entity, id }),
        }
    }

    async fn insert_row<N: Serialize, T: DeserializeOwned>(
        &self,
        ctx: &SecurityContext,
        entity: &'static str,
        table: &str,
        new: &N,
    ) -> Result<T, DomainError> {
        let serde_json::Value::Object(row) = serde_json::to_value(new).map_err(|e| {
            DomainError::Validation(format!("cannot encode {entity}: {e}"))
        })?
        else {
            return Err(DomainError::Validation(format!("{entity} must encode as an object")));
        };
        let stored = self.data.insert(ctx, table, row).await?;
        debug!(table, "inserted row");
        decode(entity, stored)
    }

    /// `relation` is `(table, view)`. Under an owner scope the row is first
    /// looked up through the view with the owner predicate.
    async fn delete_row(
        &self,
        ctx: &SecurityContext,
        entity: &'static str,
        relation: (&str, &str),
        id: Uuid,
        owner: Option<Expr>,
    ) -> Result<(), DomainError> {
        let (table, view) = relation;
        if let Some(owner) = owner {
            let found = self.data.select_by_id(ctx, view, id, vec![owner]).await?;
            if found.is_none() {
                return Err(DomainError::NotFound { entity, id });
            }
        }
        match self.data.delete(ctx, table, id).await {
            Ok(()) => {
                debug!(table, %id, "deleted row");
                Ok(())
            }
            Err(BackendError::NotFound(_)) => Err(DomainError::NotFound { entity, id }),
            Err(err) => Err(err.into()),
        }
    }
}

fn degrade<T>(
    section: DashboardSection,
    result: Result<T, DomainError>,
    degraded: &mut Vec<DashboardSection>,
) -> Result<Option<T>, DomainError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_auth() => Err(err),
        Err(err) => {
            warn!(?section, error = %err, "dashboard section failed; showing zeros");
            degraded.push(section);
            Ok(None)
        }
    }
}

fn paged<S: Schema>(builder: QueryBuilder<S>, request: PageRequest) -> SelectQuery {
    builder.page(request).count_exact().build()
}

fn search_term(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an enumerated filter value; values outside the allowed set are
/// dropped rather than rejected.
fn known<E: FromStr<Err = UnknownValue>>(raw: Option<&str>) -> Option<E> {
    let raw = search_term(raw)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(error = %err, "ignoring filter value");
            None
        }
    }
}

fn client_query(owner: Option<Uuid>, filter: &ClientFilter) -> QueryBuilder<ClientSchema> {
    QueryBuilder::new()
        .filter_opt(owner.map(|id| client::ID.eq(id)))
        .filter_opt(search_term(filter.search.as_deref()).map(|s| client::NAME.contains(s)))
        .order_by(client::NAME, SortDir::Asc)
        .order_by(client::ID, SortDir::Asc)
}

fn license_query(owner: Option<Uuid>, filter: &LicenseFilter) -> QueryBuilder<LicenseSchema> {
    let status: Option<LicenseStatus> = known(filter.status.as_deref());
    QueryBuilder::new()
        .filter_opt(owner.map(|id| license::CLIENT_ID.eq(id)))
        .filter_opt(search_term(filter.search.as_deref()).map(|s| license::NAME.contains(s)))
        .filter_opt(status.map(|s| license::STATUS.eq(s.as_str())))
        .filter_opt(filter.client_id.map(|id| license::CLIENT_ID.eq(id)))
        .order_by(license::EXPIRY_DATE, SortDir::Asc)
        .order_by(license::ID, SortDir::Asc)
}

fn equipment_query(owner: Option<Uuid>, filter: &EquipmentFilter) -> QueryBuilder<EquipmentSchema> {
    let status: Option<EquipmentStatus> = known(filter.status.as_deref());
    let equipment_type: Option<EquipmentType> = known(filter.equipment_type.as_deref());
    QueryBuilder::new()
        .filter_opt(owner.map(|id| equipment::CLIENT_ID.eq(id)))
        .filter_opt(search_term(filter.search.as_deref()).map(|s| equipment::NAME.contains(s)))
        .filter_opt(status.map(|s| equipment::STATUS.eq(s.as_str())))
        .filter_opt(equipment_type.map(|t| equipment::TYPE.eq(t.as_str())))
        .filter_opt(filter.client_id.map(|id| equipment::CLIENT_ID.eq(id)))
        .order_by_nulls(equipment::END_OF_LIFE_DATE, SortDir::Asc, NullsOrder::Last)
        .order_by(equipment::ID, SortDir::Asc)
}

fn require_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::Validation("name must not be empty".to_owned()));
    }
    Ok(())
}

/// Restricted callers may only write records of their own client.
fn check_owner(scope: &AccessScope, owner: Option<Uuid>, resource: Resource) -> Result<(), DomainError> {
    if scope.permits_owner(owner) {
        Ok(())
    } else {
        Err(DomainError::Forbidden {
            resource: resource.as_str(),
            action: Action::Create.as_str(),
        })
    }
}

fn has_id(row: &Row) -> bool {
    row.get("id").is_some_and(|id| !id.is_null())
}

fn decode<T: DeserializeOwned>(entity: &'static str, row: Row) -> Result<T, DomainError> {
    serde_json::from_value(serde_json::Value::Object(row)).map_err(|e| DomainError::Decode {
        entity,
        message: e.to_string(),
    })
}

fn decode_rows<T: DeserializeOwned>(entity: &'static str, rows: Vec<Row>) -> Result<Vec<T>, DomainError> {
    let before = rows.len();
    let items = rows
        .into_iter()
        .filter(has_id)
        .map(|row| decode(entity, row))
        .collect::<Result<Vec<T>, _>>()?;
    if items.len() < before {
        debug!(entity, dropped = before - items.len(), "dropped rows without id");
    }
    Ok(items)
}
