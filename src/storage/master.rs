use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{RecordKey, SalesRecord};
use crate::storage::fingerprint::write_atomic;

/// Owner of the persisted master dataset. Snapshots are replaced atomically:
/// a failed write leaves the previous snapshot valid.
#[derive(Debug, Clone)]
pub struct MasterStore {
    path: PathBuf,
}

impl MasterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MasterStore { path: path.into() }
    }

    /// Load the current snapshot; an absent file is an empty dataset.
    pub fn load(&self) -> Result<Vec<SalesRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let mut reader = csv::Reader::from_reader(file);
        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: SalesRecord = row.map_err(|e| {
                PipelineError::file_parse(self.path.display().to_string(), e)
            })?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn save(&self, records: &[SalesRecord]) -> Result<()> {
        write_csv_atomic(&self.path, records)
    }
}

/// Serialize rows to CSV and atomically replace `path`.
pub fn write_csv_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| PipelineError::Persistence(std::io::Error::other(e)))?;
        }
        writer
            .flush()
            .map_err(PipelineError::Persistence)?;
    }
    write_atomic(path, &buf)
}

/// Merge a freshly normalized batch into the existing master dataset.
///
/// The batch replaces the dataset outright on first run or full rebuild.
/// Otherwise the batch is appended and the natural key deduplicated keeping
/// the most recently appended row, so a re-issued distributor report for an
/// already-ingested period supersedes the old rows.
pub fn reconcile(
    existing: Vec<SalesRecord>,
    new_batch: Vec<SalesRecord>,
    full_rebuild: bool,
) -> Vec<SalesRecord> {
    if full_rebuild || existing.is_empty() {
        return new_batch;
    }

    let mut combined = existing;
    combined.extend(new_batch);

    let mut last_index: HashMap<RecordKey, usize> = HashMap::with_capacity(combined.len());
    for (idx, record) in combined.iter().enumerate() {
        debug_assert!(record.period_consistent());
        last_index.insert(record.natural_key(), idx);
    }

    combined
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| last_index[&record.natural_key()] == *idx)
        .map(|(_, record)| record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountCategory, ChannelCategory, ProductLine};
    use chrono::NaiveDate;

    fn record(account: &str, sku: &str, channel: &str, sales: f64) -> SalesRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        SalesRecord {
            date,
            year: 2024,
            month: 1,
            sales_channel_category: ChannelCategory::Distributor,
            sales_channel_name: channel.to_string(),
            account_name: account.to_string(),
            account_category: AccountCategory::Other,
            address: None,
            city: None,
            province: None,
            postal_code: None,
            sku: Some(sku.to_string()),
            sku_description: "Pale Ale 6-pack".to_string(),
            product_line: ProductLine::PaleAle,
            quantity: 1.0,
            units_per_pack: Some(6.0),
            packs_per_case: Some(6.0),
            total_units: Some(6.0),
            sales,
        }
    }

    #[test]
    fn newest_record_wins_for_a_shared_key() {
        let existing = vec![
            record("Acme Bar", "SKU1", "Horizon", 100.0),
            record("Other Bar", "SKU2", "Horizon", 40.0),
        ];
        let incoming = vec![record("Acme Bar", "SKU1", "Horizon", 150.0)];

        let merged = reconcile(existing, incoming, false);
        assert_eq!(merged.len(), 2);
        let acme: Vec<&SalesRecord> = merged
            .iter()
            .filter(|r| r.account_name == "Acme Bar")
            .collect();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].sales, 150.0);
    }

    #[test]
    fn distinct_channels_do_not_collide() {
        let existing = vec![record("Acme Bar", "SKU1", "Horizon", 100.0)];
        let incoming = vec![record("Acme Bar", "SKU1", "PSC", 90.0)];
        let merged = reconcile(existing, incoming, false);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn rebuild_and_empty_master_take_the_batch_as_is() {
        let batch = vec![record("Acme Bar", "SKU1", "Horizon", 10.0)];
        assert_eq!(reconcile(Vec::new(), batch.clone(), false).len(), 1);

        let existing = vec![record("Old", "SKU9", "Ollie", 5.0)];
        let rebuilt = reconcile(existing, batch, true);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].account_name, "Acme Bar");
    }

    #[test]
    fn snapshot_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = MasterStore::new(dir.path().join("master_dataset.csv"));
        assert!(store.load().unwrap().is_empty());

        let records = vec![
            record("Acme Bar", "SKU1", "Horizon", 100.0),
            record("Other Bar", "SKU2", "Ollie", 55.5),
        ];
        store.save(&records).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].account_name, "Acme Bar");
        assert_eq!(loaded[1].sales, 55.5);
        assert_eq!(loaded[1].product_line, ProductLine::PaleAle);
    }
}
