use chrono::NaiveDate;

use crate::error::{PipelineError, Result};
use crate::models::raw_table::{find_header_row, parse_number, read_workbook_sheets, RawTable};
use crate::models::schema::{optional, required, SourceSchema};
use crate::models::{ChannelCategory, SalesRecord};
use crate::processor::classify::{account_category_from_name, product_line};
use crate::processor::pack_size::case_pack_notation;
use crate::processor::period::period_from_filename;

const CHANNEL_NAME: &str = "Horizon";

const SCHEMA: SourceSchema = SourceSchema {
    source: "Horizon",
    columns: &[
        required("CUSTOMER"),
        required("SKU DESCRIPTION"),
        required("QUANTITY"),
        required("SALES"),
        optional("ADDRESS"),
        optional("CITY"),
        optional("PROV"),
        optional("PROVINCE"),
        optional("POSTAL"),
        optional("SKU#"),
    ],
};

/// Normalizes Horizon distributor reports. Each file covers one month named
/// in the file name; the report itself carries no date column, so every
/// record is dated to the first of that month. The workbook layout buries
/// the header under title rows, so it is located by scanning rather than
/// assumed at a fixed offset.
pub struct HorizonNormalizer;

impl HorizonNormalizer {
    pub fn new() -> Self {
        HorizonNormalizer
    }

    pub fn normalize(&self, bytes: &[u8], file_name: &str) -> Result<Vec<SalesRecord>> {
        let period = period_from_filename(file_name).ok_or_else(|| {
            PipelineError::MetadataExtraction {
                name: file_name.to_string(),
            }
        })?;
        let date = NaiveDate::from_ymd_opt(period.year, period.month, 1).ok_or_else(|| {
            PipelineError::file_parse(
                file_name,
                format!("invalid period {}-{}", period.year, period.month),
            )
        })?;

        let mut table = self.read_table(bytes, file_name)?;
        table.drop_empty_columns();
        table.drop_trailing_total_row();
        let columns = SCHEMA.resolve(&table, file_name)?;

        let mut records = Vec::new();
        for row in 0..table.rows.len() {
            let account_name = match columns.cell(&table, row, "CUSTOMER") {
                Some(name) if !name.eq_ignore_ascii_case("nan") => name.to_string(),
                _ => continue,
            };

            let description = columns
                .cell(&table, row, "SKU DESCRIPTION")
                .unwrap_or_default()
                .to_string();
            let quantity = columns
                .cell(&table, row, "QUANTITY")
                .and_then(parse_number)
                .unwrap_or(0.0);
            let sales = columns
                .cell(&table, row, "SALES")
                .and_then(parse_number)
                .unwrap_or(0.0);

            let case_pack = case_pack_notation(&description);
            let packs_per_case = case_pack.map(|(packs, _)| packs);
            let units_per_pack = case_pack.map(|(_, units)| units);
            let total_units = case_pack.map(|(packs, units)| quantity * packs * units);

            let province = columns
                .cell(&table, row, "PROV")
                .or_else(|| columns.cell(&table, row, "PROVINCE"))
                .map(str::to_string);

            records.push(SalesRecord {
                date,
                year: period.year,
                month: period.month,
                sales_channel_category: ChannelCategory::Distributor,
                sales_channel_name: CHANNEL_NAME.to_string(),
                account_category: account_category_from_name(&account_name),
                account_name,
                address: columns.cell(&table, row, "ADDRESS").map(str::to_string),
                city: columns.cell(&table, row, "CITY").map(str::to_string),
                province,
                postal_code: columns.cell(&table, row, "POSTAL").map(str::to_string),
                sku: columns.cell(&table, row, "SKU#").map(str::to_string),
                product_line: product_line(&description),
                sku_description: description,
                quantity,
                units_per_pack,
                packs_per_case,
                total_units,
                sales,
            });
        }

        records.retain(SalesRecord::is_retainable);
        Ok(records)
    }

    fn read_table(&self, bytes: &[u8], file_name: &str) -> Result<RawTable> {
        if file_name.to_lowercase().ends_with(".csv") {
            return RawTable::from_csv(bytes, file_name);
        }
        let sheets = read_workbook_sheets(bytes, file_name)?;
        let sheet = sheets
            .first()
            .ok_or_else(|| PipelineError::file_parse(file_name, "workbook has no sheets"))?;
        let header_idx =
            find_header_row(&sheet.grid, &["customer", "sku description"]).unwrap_or(0);
        Ok(RawTable::from_grid(&sheet.grid, header_idx))
    }
}
