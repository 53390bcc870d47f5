//! Aggregates shown on the statistics pages and the dashboard.
//!
//! Category maps always carry every category, zero-filled. Percentages are
//! present only when there is something to divide by.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{EquipmentStatus, EquipmentType, LicenseStatus};

/// Licenses expiring within one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyExpiry {
    /// First day of the month.
    pub month: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStats {
    pub total: u64,
    pub by_status: BTreeMap<LicenseStatus, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentages: Option<BTreeMap<LicenseStatus, u64>>,
    /// Six buckets starting at the current month.
    pub monthly_expiry: Vec<MonthlyExpiry>,
    pub expiring_soon: u64,
}

impl LicenseStats {
    /// Zero-valued stats with an empty bucket for each of `months`.
    #[must_use]
    pub fn empty(months: &[NaiveDate]) -> Self {
        Self {
            total: 0,
            by_status: LicenseStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            percentages: None,
            monthly_expiry: months
                .iter()
                .map(|m| MonthlyExpiry {
                    month: *m,
                    count: 0,
                })
                .collect(),
            expiring_soon: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentStats {
    pub total: u64,
    pub by_type: BTreeMap<EquipmentType, u64>,
    pub by_status: BTreeMap<EquipmentStatus, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_percentages: Option<BTreeMap<EquipmentType, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_percentages: Option<BTreeMap<EquipmentStatus, u64>>,
}

impl Default for EquipmentStats {
    fn default() -> Self {
        Self {
            total: 0,
            by_type: EquipmentType::ALL.iter().map(|t| (*t, 0)).collect(),
            by_status: EquipmentStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            type_percentages: None,
            status_percentages: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardSection {
    Clients,
    Licenses,
    Equipment,
}

/// All three aggregates at once. Sections whose query failed are zeroed and
/// listed in `degraded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub clients: ClientStats,
    pub licenses: LicenseStats,
    pub equipment: EquipmentStats,
    #[serde(default)]
    pub degraded: Vec<DashboardSection>,
}

impl Dashboard {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_stats_are_zero_filled() {
        let months: Vec<NaiveDate> = (1..=6)
            .map(|m| NaiveDate::from_ymd_opt(2026, m, 1).unwrap())
            .collect();
        let stats = LicenseStats::empty(&months);
        assert_eq!(stats.by_status.len(), 4);
        assert!(stats.by_status.values().all(|c| *c == 0));
        assert_eq!(stats.monthly_expiry.len(), 6);

        let eq = EquipmentStats::default();
        assert_eq!(eq.by_type.len(), 6);
        assert_eq!(eq.by_status.len(), 5);
    }

    #[test]
    fn category_maps_serialize_with_wire_keys() {
        let value = serde_json::to_value(EquipmentStats::default()).unwrap();
        assert_eq!(value["by_status"]["soon_obsolete"], json!(0));
        assert_eq!(value["by_type"]["pc"], json!(0));
        assert!(value.get("type_percentages").is_none());
    }
}
