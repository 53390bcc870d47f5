//! In-memory reductions behind the statistics pages.
//!
//! Every function starts from the zero-valued structure and folds the rows
//! into it, so empty input yields all-zero counts and no percentages.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use inventory_sdk::{
    ClientStats, Equipment, EquipmentStats, License, LicenseStats, LicenseStatus,
};

/// Number of monthly expiry buckets, starting with the current month.
pub const EXPIRY_MONTHS: u32 = 6;

/// `round(100 * count / total)` in integer arithmetic, halves rounding up.
#[must_use]
pub fn percentage(count: u64, total: u64) -> u64 {
    count
        .saturating_mul(200)
        .saturating_add(total)
        .checked_div(total.saturating_mul(2))
        .unwrap_or(0)
}

fn percentages<K: Ord + Copy>(counts: &BTreeMap<K, u64>, total: u64) -> Option<BTreeMap<K, u64>> {
    (total > 0).then(|| counts.iter().map(|(k, c)| (*k, percentage(*c, total))).collect())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First days of the `EXPIRY_MONTHS` months starting with `today`'s month.
#[must_use]
pub fn expiry_months(today: NaiveDate) -> Vec<NaiveDate> {
    let start = first_of_month(today);
    (0..EXPIRY_MONTHS)
        .filter_map(|offset| start.checked_add_months(Months::new(offset)))
        .collect()
}

#[must_use]
pub fn license_stats<'a>(licenses: impl IntoIterator<Item = &'a License>, today: NaiveDate) -> LicenseStats {
    let months = expiry_months(today);
    let mut stats = LicenseStats::empty(&months);

    for license in licenses {
        stats.total += 1;
        *stats.by_status.entry(license.status).or_default() += 1;

        if let Some(expiry) = license.expiry_date {
            let month = first_of_month(expiry);
            if let Some(bucket) = stats.monthly_expiry.iter_mut().find(|b| b.month == month) {
                bucket.count += 1;
            }
        }
    }

    stats.expiring_soon = stats
        .by_status
        .get(&LicenseStatus::AboutToExpire)
        .copied()
        .unwrap_or(0);
    stats.percentages = percentages(&stats.by_status, stats.total);
    stats
}

#[must_use]
pub fn equipment_stats<'a>(equipment: impl IntoIterator<Item = &'a Equipment>) -> EquipmentStats {
    let mut stats = EquipmentStats::default();
    for item in equipment {
        stats.total += 1;
        *stats.by_type.entry(item.equipment_type).or_default() += 1;
        *stats.by_status.entry(item.status).or_default() += 1;
    }
    stats.type_percentages = percentages(&stats.by_type, stats.total);
    stats.status_percentages = percentages(&stats.by_status, stats.total);
    stats
}

#[must_use]
pub fn client_stats(total: u64) -> ClientStats {
    ClientStats { total }
}

/// Zero-valued license stats for a degraded dashboard section.
#[must_use]
pub fn empty_license_stats(today: NaiveDate) -> LicenseStats {
    LicenseStats::empty(&expiry_months(today))
}
