//! Gold tables into BigQuery
//!
//! Each table is loaded by a BigQuery load job that reads the gold Parquet file
//! straight from the bucket and truncates the destination table. The loader
//! inserts the job through the REST API and polls it until it is `DONE`.

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::LayerPaths;
use crate::config::WarehouseConfig;
use crate::error::{EtlError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl std::fmt::Display for ErrorProto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.reason.as_deref().unwrap_or("error"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

pub struct WarehouseLoader {
    client: Client,
    api_base: String,
    project_id: String,
    dataset: String,
    access_token: String,
    bucket: String,
    poll_interval: Duration,
    job_timeout: Duration,
}

impl WarehouseLoader {
    /// Loader reading gold files from `bucket`.
    pub fn new(config: &WarehouseConfig, bucket: &str) -> Result<Self> {
        let missing = |name: &str| EtlError::warehouse(format!("{} is not configured", name));

        Ok(Self {
            client: Client::builder().build()?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            project_id: config
                .project_id
                .clone()
                .ok_or_else(|| missing("GCP_PROJECT_ID"))?,
            dataset: config.dataset.clone().ok_or_else(|| missing("BQ_DATASET"))?,
            access_token: config
                .access_token
                .clone()
                .ok_or_else(|| missing("GCP_ACCESS_TOKEN"))?,
            bucket: bucket.to_string(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
        })
    }

    /// `project.dataset.table`
    pub fn table_id(&self, table: &str) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, table)
    }

    /// Request body of a truncating Parquet load job.
    pub fn load_job_body(&self, job_id: &str, source_uri: &str, table: &str) -> Value {
        json!({
            "jobReference": {
                "projectId": self.project_id,
                "jobId": job_id,
            },
            "configuration": {
                "load": {
                    "sourceUris": [source_uri],
                    "sourceFormat": "PARQUET",
                    "writeDisposition": "WRITE_TRUNCATE",
                    "destinationTable": {
                        "projectId": self.project_id,
                        "datasetId": self.dataset,
                        "tableId": table,
                    },
                },
            },
        })
    }

    /// Load every table in `tables` from its gold file, in order.
    pub async fn load_gold(&self, paths: &LayerPaths, tables: &[&str]) -> Result<Vec<String>> {
        let mut jobs = Vec::with_capacity(tables.len());
        for table in tables {
            let source_uri = LayerPaths::gs_uri(&self.bucket, &paths.gold(table));
            jobs.push(self.load_table(&source_uri, table).await?);
        }

        info!(tables = jobs.len(), "BigQuery loading complete");
        Ok(jobs)
    }

    /// Run one load job to completion. Returns the job id.
    #[instrument(skip(self))]
    pub async fn load_table(&self, source_uri: &str, table: &str) -> Result<String> {
        info!("Loading {} -> {}", source_uri, self.table_id(table));

        let job_id = format!("swapi_etl_{}_{}", table, Uuid::new_v4().simple());
        let body = self.load_job_body(&job_id, source_uri, table);

        let response = self
            .client
            .post(format!("{}/projects/{}/jobs", self.api_base, self.project_id))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let job: Job = decode(response, "insert load job").await?;

        self.wait_for(job).await?;

        info!("Loaded {} into {}", source_uri, self.table_id(table));
        Ok(job_id)
    }

    async fn wait_for(&self, mut job: Job) -> Result<()> {
        let deadline = Instant::now() + self.job_timeout;

        loop {
            if let Some(status) = &job.status {
                debug!(job_id = %job.job_reference.job_id, state = %status.state, "Load job status");
                if status.state == "DONE" {
                    return match &status.error_result {
                        Some(error) => Err(EtlError::warehouse(format!(
                            "job {} failed: {}",
                            job.job_reference.job_id, error
                        ))),
                        None => Ok(()),
                    };
                }
            }

            if Instant::now() >= deadline {
                return Err(EtlError::warehouse(format!(
                    "job {} did not finish within {}s",
                    job.job_reference.job_id,
                    self.job_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;

            job = self.get_job(&job.job_reference).await?;
        }
    }

    async fn get_job(&self, reference: &JobReference) -> Result<Job> {
        let mut request = self
            .client
            .get(format!(
                "{}/projects/{}/jobs/{}",
                self.api_base, self.project_id, reference.job_id
            ))
            .bearer_auth(&self.access_token);

        if let Some(location) = &reference.location {
            request = request.query(&[("location", location)]);
        }

        decode(request.send().await?, "get load job").await
    }
}

async fn decode(response: Response, action: &str) -> Result<Job> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EtlError::warehouse(format!(
            "{} returned {}: {}",
            action, status, body
        )));
    }
    Ok(response.json().await?)
}
