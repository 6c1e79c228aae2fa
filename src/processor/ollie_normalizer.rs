use chrono::Datelike;
use tracing::debug;

use crate::error::Result;
use crate::models::raw_table::{parse_date, parse_number, RawTable};
use crate::models::schema::{optional, required, SourceSchema};
use crate::models::{AccountCategory, ChannelCategory, SalesRecord};
use crate::processor::classify::{account_category_from_code, product_line};
use crate::processor::pack_size::{slash_pack_notation, PackRule, PackSizeExtractor};

const CHANNEL_NAME: &str = "Ollie";
const PACKS_PER_CASE: f64 = 6.0;

const SCHEMA: SourceSchema = SourceSchema {
    source: "Ollie",
    columns: &[
        required("Date"),
        required("Buyer"),
        required("Quantity"),
        required("Total"),
        required("Variant Name"),
        optional("Customer Type"),
        optional("Address1"),
        optional("City"),
        optional("State"),
        optional("Zip/postal code"),
        optional("SKU"),
    ],
};

/// Normalizes Ollie CSV exports. Ollie rows carry a real order date, so
/// dates stay exact rather than being pinned to the first of the month.
pub struct OllieNormalizer {
    packs: PackSizeExtractor,
}

impl OllieNormalizer {
    pub fn new() -> Self {
        OllieNormalizer {
            packs: PackSizeExtractor::new(),
        }
    }

    pub fn normalize(&self, bytes: &[u8], file_name: &str) -> Result<Vec<SalesRecord>> {
        let mut table = RawTable::from_csv(bytes, file_name)?;
        table.drop_empty_columns();
        let columns = SCHEMA.resolve(&table, file_name)?;

        let mut records = Vec::new();
        let mut dropped_dates = 0usize;

        for row in 0..table.rows.len() {
            let Some(date) = columns.cell(&table, row, "Date").and_then(parse_date) else {
                dropped_dates += 1;
                continue;
            };

            let account_name = columns
                .cell(&table, row, "Buyer")
                .unwrap_or("Unknown")
                .to_string();
            let description = columns
                .cell(&table, row, "Variant Name")
                .unwrap_or_default()
                .to_string();
            let quantity = columns
                .cell(&table, row, "Quantity")
                .and_then(parse_number)
                .unwrap_or(0.0);
            let sales = columns
                .cell(&table, row, "Total")
                .and_then(parse_number)
                .unwrap_or(0.0);

            let account_category = columns
                .cell(&table, row, "Customer Type")
                .map(account_category_from_code)
                .unwrap_or(AccountCategory::Other);

            // X-pack wins outright; after that the "/<N>*" variant notation
            // outranks the remaining rules, whose multiplier pattern would
            // misread the volume suffix ("/6*355ml") as a pack multiplier.
            let extraction = self.packs.extract(&description, quantity);
            let units_per_pack = match extraction.rule {
                Some(PackRule::XPack) => extraction.units_per_pack,
                _ => slash_pack_notation(&description).or(extraction.units_per_pack),
            };
            let total_units = units_per_pack.map(|units| quantity * units);

            records.push(SalesRecord {
                date,
                year: date.year(),
                month: date.month(),
                sales_channel_category: ChannelCategory::Distributor,
                sales_channel_name: CHANNEL_NAME.to_string(),
                account_name,
                account_category,
                address: columns.cell(&table, row, "Address1").map(str::to_string),
                city: columns.cell(&table, row, "City").map(str::to_string),
                province: columns.cell(&table, row, "State").map(str::to_string),
                postal_code: columns
                    .cell(&table, row, "Zip/postal code")
                    .map(str::to_string),
                sku: columns.cell(&table, row, "SKU").map(str::to_string),
                product_line: product_line(&description),
                sku_description: description,
                quantity,
                units_per_pack,
                packs_per_case: Some(PACKS_PER_CASE),
                total_units,
                sales,
            });
        }

        if dropped_dates > 0 {
            debug!(
                "{}: dropped {} rows with unparseable dates",
                file_name, dropped_dates
            );
        }

        records.retain(SalesRecord::is_retainable);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductLine;

    const CSV: &str = "\
Date,Buyer,Customer Type,Address1,City,State,Zip/postal code,Variant Name,SKU,Quantity,Total,Notes
2024-04-02,Corner Liquor,LRS,9 Oak Ave,Victoria,BC,V8V 2B2,Pale Ale 6-pack,PA6,3,108.00,
2024-04-03,Harbour Grill,LIC,1 Wharf St,Victoria,BC,V8V 3C3,Pilsner/6*355ml,PIL6,2,72.00,
2024-04-04,Empty Order,LIC,2 Wharf St,Victoria,BC,V8V 3C4,Pale Ale 6-pack,PA6,0,0.00,
not-a-date,Bad Row,LIC,,,,,Pale Ale 6-pack,PA6,1,36.00,
";

    #[test]
    fn rows_map_to_canonical_records() {
        let records = OllieNormalizer::new()
            .normalize(CSV.as_bytes(), "ollie_april.csv")
            .unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.sales_channel_name, "Ollie");
        assert_eq!(first.sales_channel_category, ChannelCategory::Distributor);
        assert_eq!(first.account_name, "Corner Liquor");
        assert_eq!(first.account_category, AccountCategory::RetailStore);
        assert_eq!(first.product_line, ProductLine::PaleAle);
        assert_eq!((first.year, first.month), (2024, 4));
        assert_eq!(first.date.day(), 2);
        assert_eq!(first.units_per_pack, Some(6.0));
        assert_eq!(first.total_units, Some(18.0));
        assert_eq!(first.sales, 108.0);
    }

    #[test]
    fn slash_notation_fallback_fills_units_per_pack() {
        let records = OllieNormalizer::new()
            .normalize(CSV.as_bytes(), "ollie_april.csv")
            .unwrap();
        let pilsner = &records[1];
        assert_eq!(pilsner.units_per_pack, Some(6.0));
        assert_eq!(pilsner.total_units, Some(12.0));
        assert_eq!(pilsner.account_category, AccountCategory::RestaurantBar);
    }

    #[test]
    fn zero_and_dateless_rows_are_dropped() {
        let records = OllieNormalizer::new()
            .normalize(CSV.as_bytes(), "ollie_april.csv")
            .unwrap();
        assert!(records.iter().all(|r| r.sales > 0.0 && r.quantity > 0.0));
        assert!(!records.iter().any(|r| r.account_name == "Bad Row"));
    }

    #[test]
    fn missing_required_column_is_a_parse_error() {
        let err = OllieNormalizer::new()
            .normalize(b"Date,Buyer\n2024-01-01,Someone\n", "broken.csv")
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("broken.csv"));
    }
}
