use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::SalesRecord;

/// Day thresholds for the tri-state account status, relative to the latest
/// order date in the dataset. The bands are contiguous: anything past the
/// active window and short of the inactive cutoff needs a check-in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub active_within_days: i64,
    pub inactive_after_days: i64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        StatusThresholds {
            active_within_days: 90,
            inactive_after_days: 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    #[serde(rename = "Check-In Needed")]
    CheckInNeeded,
    #[serde(rename = "Non-Active")]
    NonActive,
}

impl StatusThresholds {
    pub fn classify(&self, days_since_last_order: i64) -> AccountStatus {
        if days_since_last_order <= self.active_within_days {
            AccountStatus::Active
        } else if days_since_last_order >= self.inactive_after_days {
            AccountStatus::NonActive
        } else {
            AccountStatus::CheckInNeeded
        }
    }
}

/// Per-account rollup consumed by the reporting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatusRecord {
    #[serde(rename = "Account Name")]
    pub account_name: String,
    #[serde(rename = "Last Order Date")]
    pub last_order_date: NaiveDate,
    #[serde(rename = "Days Since Last Order")]
    pub days_since_last_order: i64,
    #[serde(rename = "Account Status")]
    pub status: AccountStatus,
    #[serde(rename = "Total Sales")]
    pub total_sales: f64,
    #[serde(rename = "Total Quantity")]
    pub total_quantity: f64,
    #[serde(rename = "Total Units")]
    pub total_units: f64,
}

struct AccountRollup {
    display_name: String,
    last_order_date: NaiveDate,
    total_sales: f64,
    total_quantity: f64,
    total_units: f64,
}

/// Build the account status view from the master dataset. Accounts are
/// grouped case-insensitively; the display name follows the account's most
/// recent record.
pub fn generate_account_status(
    records: &[SalesRecord],
    thresholds: &StatusThresholds,
) -> Vec<AccountStatusRecord> {
    let Some(latest) = records.iter().map(|r| r.date).max() else {
        return Vec::new();
    };

    let mut rollups: HashMap<String, AccountRollup> = HashMap::new();
    for record in records {
        let key = record.account_name.to_lowercase();
        let entry = rollups.entry(key).or_insert_with(|| AccountRollup {
            display_name: record.account_name.clone(),
            last_order_date: record.date,
            total_sales: 0.0,
            total_quantity: 0.0,
            total_units: 0.0,
        });
        if record.date >= entry.last_order_date {
            entry.last_order_date = record.date;
            entry.display_name = record.account_name.clone();
        }
        entry.total_sales += record.sales;
        entry.total_quantity += record.quantity;
        entry.total_units += record.total_units.unwrap_or(0.0);
    }

    let mut statuses: Vec<AccountStatusRecord> = rollups
        .into_values()
        .map(|rollup| {
            let days = (latest - rollup.last_order_date).num_days();
            AccountStatusRecord {
                account_name: rollup.display_name,
                last_order_date: rollup.last_order_date,
                days_since_last_order: days,
                status: thresholds.classify(days),
                total_sales: rollup.total_sales,
                total_quantity: rollup.total_quantity,
                total_units: rollup.total_units,
            }
        })
        .collect();

    statuses.sort_by(|a, b| a.account_name.cmp(&b.account_name));
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountCategory, ChannelCategory, ProductLine};
    use chrono::Duration;

    fn record(account: &str, date: NaiveDate, sales: f64) -> SalesRecord {
        SalesRecord {
            date,
            year: 2024,
            month: 1,
            sales_channel_category: ChannelCategory::Distributor,
            sales_channel_name: "Horizon".to_string(),
            account_name: account.to_string(),
            account_category: AccountCategory::Other,
            address: None,
            city: None,
            province: None,
            postal_code: None,
            sku: Some("SKU1".to_string()),
            sku_description: "Pale Ale 4/6x".to_string(),
            product_line: ProductLine::PaleAle,
            quantity: 1.0,
            units_per_pack: Some(6.0),
            packs_per_case: Some(4.0),
            total_units: Some(24.0),
            sales,
        }
    }

    #[test]
    fn hundred_day_gap_needs_a_check_in() {
        let latest = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let statuses = generate_account_status(
            &[
                record("Fresh Account", latest, 50.0),
                record("Stale Account", latest - Duration::days(100), 80.0),
            ],
            &StatusThresholds::default(),
        );

        assert_eq!(statuses.len(), 2);
        let stale = statuses
            .iter()
            .find(|s| s.account_name == "Stale Account")
            .unwrap();
        assert_eq!(stale.days_since_last_order, 100);
        assert_eq!(stale.status, AccountStatus::CheckInNeeded);

        let fresh = statuses
            .iter()
            .find(|s| s.account_name == "Fresh Account")
            .unwrap();
        assert_eq!(fresh.status, AccountStatus::Active);
    }

    #[test]
    fn threshold_bands_are_contiguous() {
        let thresholds = StatusThresholds::default();
        assert_eq!(thresholds.classify(0), AccountStatus::Active);
        assert_eq!(thresholds.classify(90), AccountStatus::Active);
        assert_eq!(thresholds.classify(91), AccountStatus::CheckInNeeded);
        assert_eq!(thresholds.classify(179), AccountStatus::CheckInNeeded);
        assert_eq!(thresholds.classify(180), AccountStatus::NonActive);
    }

    #[test]
    fn accounts_group_case_insensitively_and_sum_sales() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let statuses = generate_account_status(
            &[
                record("Acme Bar", date, 100.0),
                record("ACME BAR", date + Duration::days(10), 40.0),
            ],
            &StatusThresholds::default(),
        );
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].account_name, "ACME BAR");
        assert_eq!(statuses[0].total_sales, 140.0);
        assert_eq!(statuses[0].days_since_last_order, 0);
    }

    #[test]
    fn empty_master_yields_empty_report() {
        let statuses = generate_account_status(&[], &StatusThresholds::default());
        assert!(statuses.is_empty());
    }
}
