use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Top-level sales channel split: direct-to-consumer orders vs distributor
/// reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCategory {
    #[serde(rename = "DTC")]
    Dtc,
    Distributor,
}

/// Product line buckets derived from keyword matches on SKU descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductLine {
    #[serde(rename = "Pale Ale")]
    PaleAle,
    Pilsner,
    #[serde(rename = "IPA")]
    Ipa,
    #[serde(rename = "Dark Lager")]
    DarkLager,
    Other,
}

/// Account classification, from customer-type codes where the source carries
/// them and from name keywords otherwise. Never left unassigned: anything
/// unmatched lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCategory {
    Personal,
    Commercial,
    #[serde(rename = "Restaurant/Bar")]
    RestaurantBar,
    Grocery,
    #[serde(rename = "Retail Store")]
    RetailStore,
    #[serde(rename = "Rural Store")]
    RuralStore,
    #[serde(rename = "Manufacturer Channel")]
    ManufacturerChannel,
    Other,
}

/// Dedup key for the master dataset: (date, account, sku, channel name).
/// The newest record for a key supersedes older ones on reconcile.
pub type RecordKey = (NaiveDate, String, String, String);

/// The unified row shape every normalizer produces. Serialized field names
/// double as the column set of the exported master dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Sales Channel Category")]
    pub sales_channel_category: ChannelCategory,
    #[serde(rename = "Sales Channel Name")]
    pub sales_channel_name: String,
    #[serde(rename = "Account Name")]
    pub account_name: String,
    #[serde(rename = "Account Category")]
    pub account_category: AccountCategory,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Province")]
    pub province: Option<String>,
    #[serde(rename = "Postal Code")]
    pub postal_code: Option<String>,
    #[serde(rename = "Sku")]
    pub sku: Option<String>,
    #[serde(rename = "Sku Description")]
    pub sku_description: String,
    #[serde(rename = "Product Line")]
    pub product_line: ProductLine,
    #[serde(rename = "Quantity")]
    pub quantity: f64,
    #[serde(rename = "Units Per Pack")]
    pub units_per_pack: Option<f64>,
    #[serde(rename = "Packs Per Case")]
    pub packs_per_case: Option<f64>,
    #[serde(rename = "Total Units")]
    pub total_units: Option<f64>,
    #[serde(rename = "Sales")]
    pub sales: f64,
}

impl SalesRecord {
    pub fn natural_key(&self) -> RecordKey {
        (
            self.date,
            self.account_name.clone(),
            self.sku.clone().unwrap_or_default(),
            self.sales_channel_name.clone(),
        )
    }

    /// Retention filter shared by every normalizer: a record only enters a
    /// batch when it represents an actual sale.
    pub fn is_retainable(&self) -> bool {
        self.sales > 0.0 && self.quantity > 0.0
    }

    /// Year and month must always agree with the record date.
    pub fn period_consistent(&self) -> bool {
        self.date.year() == self.year && self.date.month() == self.month
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: NaiveDate, quantity: f64, sales: f64) -> SalesRecord {
        SalesRecord {
            date,
            year: date.year(),
            month: date.month(),
            sales_channel_category: ChannelCategory::Distributor,
            sales_channel_name: "Horizon".to_string(),
            account_name: "Acme Bar".to_string(),
            account_category: AccountCategory::RestaurantBar,
            address: None,
            city: None,
            province: None,
            postal_code: None,
            sku: Some("SKU1".to_string()),
            sku_description: "Pale Ale 6-pack".to_string(),
            product_line: ProductLine::PaleAle,
            quantity,
            units_per_pack: Some(6.0),
            packs_per_case: Some(4.0),
            total_units: Some(quantity * 24.0),
            sales,
        }
    }

    #[test]
    fn retention_requires_positive_sales_and_quantity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(record(date, 2.0, 100.0).is_retainable());
        assert!(!record(date, 0.0, 100.0).is_retainable());
        assert!(!record(date, 2.0, 0.0).is_retainable());
        assert!(!record(date, 2.0, -35.0).is_retainable());
    }

    #[test]
    fn natural_key_uses_empty_string_for_missing_sku() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rec = record(date, 1.0, 10.0);
        rec.sku = None;
        let (_, _, sku, _) = rec.natural_key();
        assert_eq!(sku, "");
    }

    #[test]
    fn csv_round_trip_keeps_column_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rec = record(date, 2.0, 50.0);

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&rec).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Date,Year,Month,Sales Channel Category"));
        assert!(text.contains("2024-03-01"));
        assert!(text.contains("Pale Ale"));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let parsed: SalesRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(parsed.date, rec.date);
        assert_eq!(parsed.product_line, ProductLine::PaleAle);
        assert_eq!(parsed.units_per_pack, Some(6.0));
    }
}
