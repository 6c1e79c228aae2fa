use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::models::raw_table::{parse_number, read_workbook_sheets, RawSheet, RawTable};
use crate::models::schema::{optional, required, SourceSchema};
use crate::models::{ChannelCategory, SalesRecord};
use crate::processor::classify::{account_category_from_name, product_line};
use crate::processor::pack_size::case_pack_notation;
use crate::processor::period::period_from_sheet_name;

const CHANNEL_NAME: &str = "PSC";

const SCHEMA: SourceSchema = SourceSchema {
    source: "PSC",
    columns: &[
        required("SKU DESCRIPTION"),
        required("QTY"),
        required("SALES"),
        optional("SKU#"),
        optional("PROV"),
    ],
};

/// Normalizes PSC workbooks: one tab per month, tab titles like "March
/// 2025". Tabs whose titles carry no period are skipped with a warning; the
/// remaining slices merge into a single batch.
pub struct PscNormalizer {
    date_range: Regex,
    single_date: Regex,
}

impl PscNormalizer {
    pub fn new() -> Self {
        PscNormalizer {
            date_range: Regex::new(r"\d{2}/\d{2}/\d{4}\s*-\s*\d{2}/\d{2}/\d{4}").unwrap(),
            single_date: Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap(),
        }
    }

    pub fn normalize(&self, bytes: &[u8], file_name: &str) -> Result<Vec<SalesRecord>> {
        let sheets = read_workbook_sheets(bytes, file_name)?;

        let mut records = Vec::new();
        for sheet in &sheets {
            match self.normalize_sheet(sheet, file_name) {
                Ok(mut sheet_records) => records.append(&mut sheet_records),
                Err(PipelineError::MetadataExtraction { name }) => {
                    warn!("{}: skipping tab '{}' without a period in its title", file_name, name);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(records)
    }

    fn normalize_sheet(&self, sheet: &RawSheet, file_name: &str) -> Result<Vec<SalesRecord>> {
        let period = period_from_sheet_name(&sheet.name).ok_or_else(|| {
            PipelineError::MetadataExtraction {
                name: sheet.name.clone(),
            }
        })?;
        let date = NaiveDate::from_ymd_opt(period.year, period.month, 1).ok_or_else(|| {
            PipelineError::file_parse(
                file_name,
                format!("invalid period {}-{}", period.year, period.month),
            )
        })?;

        let mut table = RawTable::from_grid(&sheet.grid, 0);
        table.drop_trailing_rows(2);
        table.drop_unnamed_columns();

        // No fixed header is guaranteed for the customer column: prefer one
        // whose header mentions "customer", else the second column, else the
        // first.
        let customer_col = table
            .column_containing("customer")
            .or(if table.headers.len() > 1 { Some(1) } else { None })
            .unwrap_or(0);

        let label = format!("{} [{}]", file_name, sheet.name);
        let columns = SCHEMA.resolve(&table, &label)?;

        let mut records = Vec::new();
        for row in 0..table.rows.len() {
            let account_name = self.clean_customer(table.cell(row, customer_col));
            let description = columns
                .cell(&table, row, "SKU DESCRIPTION")
                .unwrap_or_default()
                .to_string();
            let quantity = columns
                .cell(&table, row, "QTY")
                .and_then(parse_number)
                .unwrap_or(0.0);
            let sales = columns
                .cell(&table, row, "SALES")
                .and_then(parse_number)
                .unwrap_or(0.0);

            let case_pack = case_pack_notation(&description);

            records.push(SalesRecord {
                date,
                year: period.year,
                month: period.month,
                sales_channel_category: ChannelCategory::Distributor,
                sales_channel_name: CHANNEL_NAME.to_string(),
                account_category: account_category_from_name(&account_name),
                account_name,
                address: None,
                city: None,
                province: columns.cell(&table, row, "PROV").map(str::to_string),
                postal_code: None,
                sku: columns.cell(&table, row, "SKU#").map(str::to_string),
                product_line: product_line(&description),
                sku_description: description,
                quantity,
                units_per_pack: case_pack.map(|(_, units)| units),
                packs_per_case: case_pack.map(|(packs, _)| packs),
                total_units: case_pack.map(|(packs, units)| quantity * packs * units),
                sales,
            });
        }

        records.retain(SalesRecord::is_retainable);
        Ok(records)
    }

    /// Spreadsheet exports inject billing-period date ranges and literal
    /// newlines into customer cells; both must go before the name can serve
    /// as a grouping key.
    fn clean_customer(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return "Unknown".to_string();
        };
        let cleaned = self.date_range.replace_all(raw, "");
        let cleaned = self.single_date.replace_all(&cleaned, "");
        let cleaned = cleaned
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        if cleaned.is_empty() {
            "Unknown".to_string()
        } else {
            cleaned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountCategory;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn sheet(name: &str, grid: Vec<Vec<Option<String>>>) -> RawSheet {
        RawSheet {
            name: name.to_string(),
            grid,
        }
    }

    fn sample_grid() -> Vec<Vec<Option<String>>> {
        vec![
            vec![
                cell("BROKER"),
                cell("CUSTOMER 01/03/2025 - 31/03/2025"),
                cell("PROV"),
                cell("SKU#"),
                cell("SKU DESCRIPTION"),
                cell("QTY"),
                cell("SALES"),
            ],
            vec![
                cell("B1"),
                cell("Harbour\nMarket 01/03/2025"),
                cell("BC"),
                cell("P100"),
                cell("Pale Ale 4/6x355ml"),
                cell("3"),
                cell("186.00"),
            ],
            vec![
                cell("B1"),
                cell("Zero Bar"),
                cell("BC"),
                cell("P200"),
                cell("IPA 4/6x355ml"),
                cell("0"),
                cell("0"),
            ],
            // Footer rows dropped by the two-row trim.
            vec![None, None, None, None, None, None, None],
            vec![cell("TOTAL"), None, None, None, None, cell("3"), cell("186.00")],
        ]
    }

    #[test]
    fn sheet_periods_come_from_tab_titles() {
        let records = PscNormalizer::new()
            .normalize_sheet(&sheet("March 2025", sample_grid()), "psc.xlsx")
            .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.date.to_string(), "2025-03-01");
        assert_eq!(record.sales_channel_name, "PSC");
        assert_eq!(record.packs_per_case, Some(4.0));
        assert_eq!(record.units_per_pack, Some(6.0));
        assert_eq!(record.total_units, Some(72.0));
    }

    #[test]
    fn customer_cells_are_scrubbed_of_dates_and_newlines() {
        let records = PscNormalizer::new()
            .normalize_sheet(&sheet("March 2025", sample_grid()), "psc.xlsx")
            .unwrap();
        assert_eq!(records[0].account_name, "Harbour Market");
        assert_eq!(records[0].account_category, AccountCategory::Grocery);
    }

    #[test]
    fn tab_without_period_is_a_metadata_failure() {
        let err = PscNormalizer::new()
            .normalize_sheet(&sheet("Sheet1", sample_grid()), "psc.xlsx")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MetadataExtraction { .. }));
    }

    #[test]
    fn customer_column_heuristic_prefers_header_then_second_column() {
        let normalizer = PscNormalizer::new();

        let grid = vec![
            vec![cell("SKU#"), cell("Account"), cell("SKU DESCRIPTION"), cell("QTY"), cell("SALES")],
            vec![cell("P1"), cell("Corner Store"), cell("Pilsner 4/6x"), cell("1"), cell("62.00")],
        ];
        let records = normalizer
            .normalize_sheet(&sheet("April 2025", grid), "psc.xlsx")
            .unwrap();
        // No "customer" header: second column wins.
        assert_eq!(records[0].account_name, "Corner Store");
        assert_eq!(records[0].account_category, AccountCategory::RetailStore);
    }

    #[test]
    fn clean_customer_handles_blanks() {
        let normalizer = PscNormalizer::new();
        assert_eq!(normalizer.clean_customer(None), "Unknown");
        assert_eq!(
            normalizer.clean_customer(Some("01/03/2025 - 31/03/2025")),
            "Unknown"
        );
    }
}
