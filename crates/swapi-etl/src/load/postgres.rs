//! Gold tables into PostgreSQL
//!
//! Every load replaces the target table: drop, create from the table's own
//! schema, then batched inserts, all inside one transaction per table.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, instrument};

use crate::config::PostgresConfig;
use crate::error::{EtlError, Result};
use crate::table::{ColumnData, ColumnKind, Table};
use crate::transform::GoldTables;

/// Postgres caps one statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

pub struct PostgresLoader {
    pool: PgPool,
    schema: String,
}

impl PostgresLoader {
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            EtlError::Config(swapi_common::SwapiError::config(
                "DATABASE_URL or POSTGRES_HOST must be set",
            ))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await?;

        info!(
            max_connections = config.max_connections,
            schema = %config.schema,
            "Database connection pool created"
        );

        Ok(Self::with_pool(pool, &config.schema))
    }

    pub fn with_pool(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            schema: schema.to_string(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[instrument(skip(self), fields(schema = %self.schema))]
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_ident(&self.schema)
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace `schema.table` with the contents of `table`. Returns rows inserted.
    #[instrument(skip(self, table), fields(table = table.name(), rows = table.num_rows()))]
    pub async fn load_table(&self, table: &Table) -> Result<u64> {
        info!(
            "Loading table '{}.{}' with {} rows",
            self.schema,
            table.name(),
            table.num_rows()
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(&drop_table_sql(&self.schema, table.name()))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create_table_sql(&self.schema, table))
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0u64;
        let columns = table.columns().len().max(1);
        let batch_rows = (MAX_BIND_PARAMS / columns).max(1);
        let mut start = 0;
        while start < table.num_rows() {
            let end = (start + batch_rows).min(table.num_rows());
            let mut builder = insert_builder(&self.schema, table, start..end);
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
            start = end;
        }

        tx.commit().await?;

        info!("Finished loading '{}.{}'", self.schema, table.name());
        Ok(inserted)
    }

    /// Ensure the schema, then load every gold table in order.
    pub async fn load_all(&self, gold: &GoldTables) -> Result<Vec<(String, u64)>> {
        self.ensure_schema().await?;

        let mut loaded = Vec::with_capacity(gold.len());
        for table in gold.iter() {
            let rows = self.load_table(table).await?;
            loaded.push((table.name().to_string(), rows));
        }

        info!(tables = loaded.len(), "Postgres loading complete");
        Ok(loaded)
    }
}

/// Double-quoted SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int64 => "BIGINT",
        ColumnKind::Float64 => "DOUBLE PRECISION",
        ColumnKind::Utf8 => "TEXT",
        ColumnKind::Utf8List => "TEXT[]",
    }
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

pub fn drop_table_sql(schema: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", qualified(schema, table))
}

pub fn create_table_sql(schema: &str, table: &Table) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.data.kind())))
        .collect();

    format!(
        "CREATE TABLE {} ({})",
        qualified(schema, table.name()),
        columns.join(", ")
    )
}

fn insert_builder<'a>(
    schema: &str,
    table: &'a Table,
    rows: std::ops::Range<usize>,
) -> QueryBuilder<'a, Postgres> {
    let names: Vec<String> = table.columns().iter().map(|c| quote_ident(&c.name)).collect();

    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        qualified(schema, table.name()),
        names.join(", ")
    ));

    builder.push_values(rows, |mut values, row| {
        for column in table.columns() {
            match &column.data {
                ColumnData::Int64(v) => values.push_bind(v[row]),
                ColumnData::Float64(v) => values.push_bind(v[row]),
                ColumnData::Utf8(v) => values.push_bind(v[row].as_deref()),
                ColumnData::Utf8List(v) => values.push_bind(v[row].clone()),
            };
        }
    });

    builder
}
