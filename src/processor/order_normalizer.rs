use chrono::{DateTime, Datelike};
use std::collections::HashSet;
use tracing::warn;

use crate::error::Result;
use crate::models::{AccountCategory, ChannelCategory, Order, SalesRecord};
use crate::processor::classify::{product_line, province_full_name, simplify_channel};
use crate::processor::pack_size::PackSizeExtractor;

const PACKS_PER_CASE: f64 = 6.0;

/// Maps raw order-API payloads onto canonical records, exploding each order
/// into one record per line item. Order-level fields (date, customer,
/// shipping address, channel, order total) are carried to every line.
pub struct OrderNormalizer {
    packs: PackSizeExtractor,
}

impl OrderNormalizer {
    pub fn new() -> Self {
        OrderNormalizer {
            packs: PackSizeExtractor::new(),
        }
    }

    pub fn normalize(&self, orders: &[Order]) -> Result<Vec<SalesRecord>> {
        let mut records = Vec::new();
        // An account is never partially wholesale within one run: any line
        // mentioning "wholesale" flags every record of that account in this
        // batch as Commercial.
        let mut wholesale_accounts: HashSet<String> = HashSet::new();

        for order in orders {
            let created_at = match DateTime::parse_from_rfc3339(&order.created_at) {
                Ok(dt) => dt,
                Err(e) => {
                    warn!(
                        "Skipping order {:?} with unparseable created_at '{}': {}",
                        order.id, order.created_at, e
                    );
                    continue;
                }
            };
            let date = created_at.date_naive();

            let ship = order.shipping_address.clone().unwrap_or_default();
            let customer = order.customer.clone().unwrap_or_default();
            let channel = simplify_channel(order.source_name.as_deref());
            let total = order
                .total_price
                .as_deref()
                .and_then(|p| p.parse::<f64>().ok())
                .unwrap_or(0.0);
            let province = ship.province_code.as_deref().map(province_full_name);

            let account_name = {
                let full = format!(
                    "{} {}",
                    customer.first_name.as_deref().unwrap_or(""),
                    customer.last_name.as_deref().unwrap_or("")
                );
                let trimmed = full.trim().to_string();
                if trimmed.is_empty() {
                    "Guest".to_string()
                } else {
                    trimmed
                }
            };

            for item in &order.line_items {
                let description = item.name.clone().unwrap_or_default();
                let quantity = item.quantity;
                let extraction = self.packs.extract(&description, quantity);

                if description.to_lowercase().contains("wholesale") {
                    wholesale_accounts.insert(account_name.clone());
                }

                records.push(SalesRecord {
                    date,
                    year: created_at.year(),
                    month: created_at.month(),
                    sales_channel_category: ChannelCategory::Dtc,
                    sales_channel_name: channel.clone(),
                    account_name: account_name.clone(),
                    account_category: AccountCategory::Personal,
                    address: ship.address1.clone(),
                    city: ship.city.clone(),
                    province: province.clone(),
                    postal_code: ship.zip.clone(),
                    sku: item.sku.clone(),
                    sku_description: description.clone(),
                    product_line: product_line(&description),
                    quantity,
                    units_per_pack: extraction.units_per_pack,
                    packs_per_case: Some(PACKS_PER_CASE),
                    total_units: extraction.total_units,
                    sales: total,
                });
            }
        }

        for record in &mut records {
            if wholesale_accounts.contains(&record.account_name) {
                record.account_category = AccountCategory::Commercial;
            }
        }

        records.retain(SalesRecord::is_retainable);
        Ok(records)
    }
}
