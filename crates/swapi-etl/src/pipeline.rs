//! End-to-end run: extract, transform, then the enabled sinks in order
//! (object storage, Postgres, BigQuery).

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::extract::{fetch_all_pages, normalize_records, HttpFetcher, JsonFetcher, Record, Resolver};
use crate::load::{
    write_layers, LayerPaths, LayerWriter, LocalLayerWriter, ObjectStorage, PostgresLoader,
    WarehouseLoader,
};
use crate::table::Table;
use crate::transform::{build_gold_tables, build_silver, gold_table_names, GoldTables};

/// Table name of the bronze layer file
pub const BRONZE_TABLE: &str = "planets_raw";

/// Table name of the silver layer file
pub const SILVER_TABLE: &str = "planets_clean";

/// Bronze records plus resolver statistics
#[derive(Debug, Clone)]
pub struct Extracted {
    pub records: Vec<Record>,
    pub references_cached: usize,
    pub references_unresolved: usize,
    pub fetches: usize,
}

/// Silver records and the gold tables built from them
#[derive(Debug, Clone)]
pub struct Transformed {
    pub silver: Vec<Record>,
    pub gold: GoldTables,
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub bronze_rows: usize,
    pub silver_rows: usize,
    pub fact_rows: usize,
    pub gold_rows: Vec<(String, usize)>,
    pub references_cached: usize,
    pub references_unresolved: usize,
    pub files_written: Vec<String>,
    pub postgres_rows: Vec<(String, u64)>,
    pub warehouse_jobs: Vec<String>,
}

/// Enabled sinks for a run
#[derive(Default)]
pub struct Sinks {
    pub layers: Option<Box<dyn LayerWriter>>,
    pub postgres: Option<PostgresLoader>,
    pub warehouse: Option<WarehouseLoader>,
}

impl Sinks {
    /// Build the sinks selected by the run switches.
    pub async fn from_config(config: &EtlConfig) -> Result<Self> {
        let switches = config.switches;
        let mut sinks = Self::default();

        if switches.write_storage {
            sinks.layers = Some(match &config.storage.local_dir {
                Some(dir) => Box::new(LocalLayerWriter::new(dir.clone())),
                None => Box::new(ObjectStorage::new(&config.storage)?),
            });
        }

        if switches.load_postgres {
            sinks.postgres = Some(PostgresLoader::connect(&config.postgres).await?);
        }

        if switches.load_warehouse {
            let bucket = config
                .storage
                .bucket
                .as_deref()
                .ok_or_else(|| EtlError::warehouse("GCS_BUCKET is not configured"))?;
            sinks.warehouse = Some(WarehouseLoader::new(&config.warehouse, bucket)?);
        }

        Ok(sinks)
    }
}

/// Fetch every planet and resolve its cross-references.
pub async fn extract(fetcher: &dyn JsonFetcher, root_url: &str) -> Result<Extracted> {
    info!(url = root_url, "Extracting bronze data");

    let raw = fetch_all_pages(fetcher, root_url).await?;
    let mut resolver = Resolver::new(fetcher);
    let records = normalize_records(&mut resolver, raw).await;

    let extracted = Extracted {
        references_cached: resolver.cache().len(),
        references_unresolved: resolver.cache().unresolved_count(),
        fetches: resolver.fetches(),
        records,
    };

    info!(
        rows = extracted.records.len(),
        references = extracted.references_cached,
        unresolved = extracted.references_unresolved,
        "Bronze extraction complete"
    );

    Ok(extracted)
}

/// Build the silver records and the gold tables.
pub fn transform(bronze: &[Record]) -> Result<Transformed> {
    let silver = build_silver(bronze.to_vec())?;
    let gold = build_gold_tables(&silver)?;

    info!(tables = ?gold.names(), "Gold tables created");
    Ok(Transformed { silver, gold })
}

/// Run the pipeline against `fetcher` and the given sinks.
pub async fn run_with(
    fetcher: &dyn JsonFetcher,
    root_url: &str,
    sinks: &Sinks,
    paths: &LayerPaths,
) -> Result<PipelineReport> {
    let started_at = Utc::now();
    info!("SWAPI pipeline execution started");

    let extracted = extract(fetcher, root_url).await?;
    let Transformed { silver, gold } = transform(&extracted.records)?;

    let mut files_written = Vec::new();
    if let Some(writer) = &sinks.layers {
        let bronze_table = Table::from_records(BRONZE_TABLE, &extracted.records)?;
        let silver_table = Table::from_records(SILVER_TABLE, &silver)?;

        files_written = write_layers(writer.as_ref(), paths, &bronze_table, &silver_table, &gold)
            .await?
            .into_iter()
            .map(|upload| upload.key)
            .collect();
    }

    let mut postgres_rows = Vec::new();
    if let Some(postgres) = &sinks.postgres {
        info!(schema = postgres.schema(), "Loading gold tables into Postgres");
        postgres_rows = postgres.load_all(&gold).await?;
    }

    let mut warehouse_jobs = Vec::new();
    if let Some(warehouse) = &sinks.warehouse {
        if sinks.layers.is_none() {
            warn!("Gold files were not written in this run; BigQuery loads the existing ones");
        }
        warehouse_jobs = warehouse.load_gold(paths, &gold_table_names()).await?;
    }

    let report = PipelineReport {
        started_at,
        finished_at: Utc::now(),
        bronze_rows: extracted.records.len(),
        silver_rows: silver.len(),
        fact_rows: gold.fact().map(Table::num_rows).unwrap_or(0),
        gold_rows: gold
            .iter()
            .map(|t| (t.name().to_string(), t.num_rows()))
            .collect(),
        references_cached: extracted.references_cached,
        references_unresolved: extracted.references_unresolved,
        files_written,
        postgres_rows,
        warehouse_jobs,
    };

    info!(
        bronze_rows = report.bronze_rows,
        fact_rows = report.fact_rows,
        files = report.files_written.len(),
        postgres_tables = report.postgres_rows.len(),
        warehouse_jobs = report.warehouse_jobs.len(),
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "SWAPI pipeline execution completed"
    );

    Ok(report)
}

/// Run the pipeline with the sinks and source described by `config`.
pub async fn run(config: &EtlConfig) -> Result<PipelineReport> {
    let fetcher = HttpFetcher::new(config.source.timeout())?;
    let sinks = Sinks::from_config(config).await?;
    let paths = LayerPaths::new(&config.storage.base_path);

    run_with(&fetcher, &config.source.root_url, &sinks, &paths).await
}
