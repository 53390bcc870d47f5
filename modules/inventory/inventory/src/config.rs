//! Configuration for the inventory module.

use fleetdesk_cache::CachePolicy;
use fleetdesk_query::QueryLimits;
use serde::{Deserialize, Serialize};

/// Backend relations the module reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Relations {
    pub clients_table: String,
    pub licenses_table: String,
    pub equipment_table: String,
    /// Read view: clients as stored.
    pub clients_view: String,
    /// Read view: licenses joined with `client_name`.
    pub licenses_view: String,
    /// Read view: equipment joined with `client_name`.
    pub equipment_view: String,
}

impl Default for Relations {
    fn default() -> Self {
        Self {
            clients_table: "clients".to_owned(),
            licenses_table: "licenses".to_owned(),
            equipment_table: "equipment".to_owned(),
            clients_view: "clients".to_owned(),
            licenses_view: "licenses_with_client".to_owned(),
            equipment_view: "equipment_with_client".to_owned(),
        }
    }
}

/// Module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    pub relations: Relations,
    pub limits: QueryLimits,
    /// Rows per request when the aggregation layer pulls a full row set
    /// (default: 1000).
    pub stats_batch_size: u64,
    pub cache: CachePolicy,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            relations: Relations::default(),
            limits: QueryLimits::default(),
            stats_batch_size: 1000,
            cache: CachePolicy::default(),
        }
    }
}
