use chrono::Utc;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::fetcher::ShopifyFetcher;
use crate::models::SalesRecord;
use crate::processor::{
    generate_account_status, HorizonNormalizer, OllieNormalizer, OrderNormalizer, PscNormalizer,
};
use crate::storage::{
    content_hash, reconcile, write_csv_atomic, FileFilter, FileRecord, FileStore, FingerprintLog,
    MasterStore, SyncWatermark,
};

/// The distributor file formats the pipeline knows how to normalize. Adding
/// a source means adding a normalizer; there is deliberately no plugin
/// mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Horizon,
    Psc,
    Ollie,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Horizon => "horizon",
            SourceKind::Psc => "psc",
            SourceKind::Ollie => "ollie",
        }
    }

    fn file_filter(&self) -> FileFilter {
        match self {
            // Horizon folders also hold "account list" workbooks that are
            // not sales reports.
            SourceKind::Horizon => FileFilter {
                extensions: vec!["xls", "xlsx", "csv"],
                exclude_name_containing: vec!["account list"],
            },
            SourceKind::Psc => FileFilter {
                extensions: vec!["xls", "xlsx"],
                exclude_name_containing: vec![],
            },
            SourceKind::Ollie => FileFilter {
                extensions: vec!["csv"],
                exclude_name_containing: vec![],
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub full_rebuild: bool,
    pub include_orders: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            full_rebuild: false,
            include_orders: true,
        }
    }
}

/// Per-source outcome counts for the run summary.
#[derive(Debug, Clone, Default)]
pub struct SourceSummary {
    pub source: String,
    pub processed: usize,
    pub skipped_unchanged: usize,
    pub skipped_metadata: usize,
    pub failed: usize,
    pub records: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceSummary>,
    pub order_records: usize,
    pub new_records: usize,
    pub master_rows: usize,
}

impl RunSummary {
    pub fn log(&self) {
        info!("=== Pipeline Run Summary ===");
        for source in &self.sources {
            info!(
                "{}: {} processed, {} unchanged, {} without period metadata, {} failed ({} records)",
                source.source,
                source.processed,
                source.skipped_unchanged,
                source.skipped_metadata,
                source.failed,
                source.records
            );
        }
        info!("📦 Order API records: {}", self.order_records);
        info!("📊 New records this run: {}", self.new_records);
        info!("✅ Master dataset rows: {}", self.master_rows);
    }
}

/// Orchestrates one batch run: enumerate configured sources, fingerprint-gate
/// each file, normalize, fetch the order feed once, then reconcile and
/// persist. Per-file and per-source failures are contained; only the final
/// snapshot write can fail the run.
pub struct SalesPipeline<S> {
    config: PipelineConfig,
    file_store: S,
    fetcher: Option<ShopifyFetcher>,
    fingerprints: FingerprintLog,
    master: MasterStore,
    watermark: SyncWatermark,
    order_normalizer: OrderNormalizer,
    ollie_normalizer: OllieNormalizer,
    horizon_normalizer: HorizonNormalizer,
    psc_normalizer: PscNormalizer,
}

impl<S: FileStore> SalesPipeline<S> {
    pub fn new(config: PipelineConfig, file_store: S) -> Result<Self> {
        std::fs::create_dir_all(&config.cache.dir)?;

        let fingerprints = FingerprintLog::load(config.cache.fingerprint_path())?;
        if !fingerprints.is_empty() {
            info!("Loaded fingerprint log with {} entries", fingerprints.len());
        }
        let master = MasterStore::new(config.cache.master_path());
        let watermark = SyncWatermark::new(config.cache.watermark_path());

        let fetcher = match ShopifyFetcher::new(&config.shopify) {
            Ok(fetcher) => Some(fetcher),
            Err(e) => {
                warn!("Order API unavailable for this session: {}", e);
                None
            }
        };

        Ok(SalesPipeline {
            config,
            file_store,
            fetcher,
            fingerprints,
            master,
            watermark,
            order_normalizer: OrderNormalizer::new(),
            ollie_normalizer: OllieNormalizer::new(),
            horizon_normalizer: HorizonNormalizer::new(),
            psc_normalizer: PscNormalizer::new(),
        })
    }

    pub async fn run(&mut self, options: RunOptions) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if options.full_rebuild {
            info!("Full rebuild requested: all source files will be reprocessed");
            self.fingerprints.clear();
        }

        let mut batch: Vec<SalesRecord> = Vec::new();

        for (kind, folder) in self.configured_sources() {
            info!("=== Processing source: {} ===", kind.label());
            let source_summary = self
                .process_source(kind, &folder, options.full_rebuild, &mut batch)
                .await;
            summary.sources.push(source_summary);
        }

        let mut advance_watermark = None;
        if options.include_orders {
            match &self.fetcher {
                Some(fetcher) => {
                    let end = Utc::now();
                    let start = if options.full_rebuild {
                        self.config.shopify.sync_start
                    } else {
                        self.watermark
                            .load()?
                            .unwrap_or(self.config.shopify.sync_start)
                    };
                    match fetcher
                        .fetch_orders(start, end)
                        .await
                        .and_then(|orders| self.order_normalizer.normalize(&orders))
                    {
                        Ok(records) => {
                            info!("Order API produced {} records", records.len());
                            summary.order_records = records.len();
                            // An empty fetch must not advance the watermark,
                            // so the window is retried next run.
                            if !records.is_empty() {
                                advance_watermark = Some(end);
                            }
                            batch.extend(records);
                        }
                        Err(e) if e.is_recoverable() => {
                            warn!("Skipping order source for this run: {}", e)
                        }
                        Err(e) => return Err(e),
                    }
                }
                None => info!("Order source not configured; skipping"),
            }
        }

        summary.new_records = batch.len();

        let existing = if options.full_rebuild {
            Vec::new()
        } else {
            self.master.load()?
        };

        if batch.is_empty() && !options.full_rebuild {
            info!(
                "No new data this run; master dataset unchanged ({} rows)",
                existing.len()
            );
            summary.master_rows = existing.len();
            self.fingerprints.save()?;
            return Ok(summary);
        }

        let merged = reconcile(existing, batch, options.full_rebuild);
        summary.master_rows = merged.len();

        // The snapshot write is the only fatal step. Fingerprints and the
        // watermark persist strictly after it, so a failed write leaves the
        // whole run retryable against the prior snapshot.
        self.master.save(&merged)?;
        self.fingerprints.save()?;
        if options.full_rebuild {
            self.watermark.reset()?;
        }
        if let Some(end) = advance_watermark {
            self.watermark.save(end)?;
        }

        let statuses = generate_account_status(&merged, &self.config.status);
        write_csv_atomic(&self.config.cache.account_status_path(), &statuses)?;
        info!(
            "Persisted {} master rows and status for {} accounts",
            merged.len(),
            statuses.len()
        );

        Ok(summary)
    }

    fn configured_sources(&self) -> Vec<(SourceKind, String)> {
        let mut sources = Vec::new();
        if let Some(source) = &self.config.sources.horizon {
            sources.push((SourceKind::Horizon, source.folder.clone()));
        }
        if let Some(source) = &self.config.sources.psc {
            sources.push((SourceKind::Psc, source.folder.clone()));
        }
        if let Some(source) = &self.config.sources.ollie {
            sources.push((SourceKind::Ollie, source.folder.clone()));
        }
        sources
    }

    async fn process_source(
        &mut self,
        kind: SourceKind,
        folder: &str,
        full_rebuild: bool,
        batch: &mut Vec<SalesRecord>,
    ) -> SourceSummary {
        let mut summary = SourceSummary {
            source: kind.label().to_string(),
            ..Default::default()
        };

        let files = match self.file_store.list_files(folder, &kind.file_filter()).await {
            Ok(files) => files,
            Err(e) => {
                warn!("Skipping source {}: {}", kind.label(), e);
                return summary;
            }
        };
        info!("{}: {} candidate files", kind.label(), files.len());

        for file in files {
            let bytes = match self.file_store.read_file(&file).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read {}: {}", file.name, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let hash = content_hash(&bytes);
            let id = file.path.display().to_string();
            if !full_rebuild && self.fingerprints.is_processed(&id, &hash) {
                info!("⏭️ Skipping unchanged file: {}", file.name);
                summary.skipped_unchanged += 1;
                continue;
            }

            match self.normalize_file(kind, &bytes, &file.name) {
                Ok(records) => {
                    info!("✅ Processed {}: {} records", file.name, records.len());
                    self.fingerprints.record(
                        id,
                        FileRecord {
                            hash,
                            processed_at: Utc::now(),
                            rows: records.len(),
                            source: kind.label().to_string(),
                        },
                    );
                    summary.processed += 1;
                    summary.records += records.len();
                    batch.extend(records);
                }
                Err(PipelineError::MetadataExtraction { name }) => {
                    warn!("Skipping {}: no reporting period in '{}'", file.name, name);
                    summary.skipped_metadata += 1;
                }
                Err(e) => {
                    warn!("❌ Skipping {}: {}", file.name, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    fn normalize_file(
        &self,
        kind: SourceKind,
        bytes: &[u8],
        name: &str,
    ) -> Result<Vec<SalesRecord>> {
        match kind {
            SourceKind::Horizon => self.horizon_normalizer.normalize(bytes, name),
            SourceKind::Psc => self.psc_normalizer.normalize(bytes, name),
            SourceKind::Ollie => self.ollie_normalizer.normalize(bytes, name),
        }
    }
}
