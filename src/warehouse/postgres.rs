// src/warehouse/postgres.rs - Postgres-backed warehouse: schemas as datasets, day-range partitions

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use chrono::NaiveDate;
use futures::{pin_mut, SinkExt};
use log::{debug, info, warn};
use postgres_types::ToSql;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{JobState, LoadJob, LoadRequest, TableId, WarehouseClient, WarehouseConnector};
use crate::ingest::write_csv;
use crate::models::core::TimeEntry;
use crate::utils::db_connect::{connect, get_pool_status, PgPool, PgSettings};

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn partition_days(rows: &[TimeEntry]) -> BTreeSet<NaiveDate> {
    rows.iter().filter_map(|r| r.timestamp.map(|ts| ts.date())).collect()
}

/// Connects with `POSTGRES_*` settings.
pub struct PostgresConnector {
    settings: PgSettings,
}

impl PostgresConnector {
    pub fn new(settings: PgSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Self {
        Self::new(PgSettings::from_env())
    }
}

impl WarehouseConnector for PostgresConnector {
    type Client = PostgresWarehouse;

    async fn authenticate(&self) -> Result<PostgresWarehouse> {
        let pool = connect(&self.settings).await?;
        Ok(PostgresWarehouse::new(pool, &self.settings.dbname))
    }
}

pub struct PostgresWarehouse {
    pool: PgPool,
    project_id: String,
    running: Mutex<HashMap<String, JoinHandle<Result<u64>>>>,
}

impl PostgresWarehouse {
    pub fn new(pool: PgPool, project_id: &str) -> Self {
        Self {
            pool,
            project_id: project_id.to_string(),
            running: Mutex::new(HashMap::new()),
        }
    }

    async fn track(&self, job_id: &str, handle: JoinHandle<Result<u64>>) {
        self.running.lock().await.insert(job_id.to_string(), handle);
    }
}

/// Create-if-missing, truncate, add day partitions, then COPY. One transaction.
async fn run_load(pool: PgPool, request: LoadRequest) -> Result<u64> {
    let mut conn = pool.get().await.context("Failed to get DB connection for load")?;
    let (total, idle, in_use) = get_pool_status(&pool);
    debug!("Pool status before load: total={}, idle={}, in_use={}", total, idle, in_use);

    let TableId { dataset, table, .. } = &request.table_id;
    let target = qualified_name(dataset, table);
    let date_column = quote_ident(&request.partition_field);

    let tx = conn.transaction().await.context("Failed to start load transaction")?;
    tx.batch_execute(&format!(
        "CREATE TABLE IF NOT EXISTS {} (\
            \"user\" TEXT, \
            hours DOUBLE PRECISION, \
            project TEXT, \
            \"timestamp\" TIMESTAMP\
        ) PARTITION BY RANGE ({})",
        target, date_column
    ))
    .await
    .with_context(|| format!("Failed to create table {}", target))?;
    tx.batch_execute(&format!("TRUNCATE TABLE {}", target))
        .await
        .with_context(|| format!("Failed to truncate {}", target))?;
    tx.batch_execute(&format!(
        "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} DEFAULT",
        qualified_name(dataset, &format!("{}_default", table)),
        target
    ))
    .await
    .context("Failed to create default partition")?;

    let days = partition_days(&request.rows);
    for day in &days {
        let Some(next_day) = day.succ_opt() else {
            warn!("No partition bound after {}, rows stay in default partition", day);
            continue;
        };
        let partition = qualified_name(dataset, &format!("{}_p{}", table, day.format("%Y%m%d")));
        tx.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} FOR VALUES FROM ('{} 00:00:00') TO ('{} 00:00:00')",
            partition, target, day, next_day
        ))
        .await
        .with_context(|| format!("Failed to create partition {}", partition))?;
    }
    debug!("{} day partitions ready on {}", days.len(), target);

    let mut payload = Vec::new();
    write_csv(&request.rows, &mut payload)?;
    let sink = tx
        .copy_in(&format!(
            "COPY {} (\"user\", hours, project, \"timestamp\") FROM STDIN WITH (FORMAT csv, HEADER true)",
            target
        ))
        .await
        .context("Failed to start COPY")?;
    pin_mut!(sink);
    sink.send(Bytes::from(payload)).await.context("Failed to stream rows")?;
    let copied = sink.finish().await.context("Failed to finish COPY")?;

    tx.commit().await.context("Failed to commit load")?;
    Ok(copied)
}

impl WarehouseClient for PostgresWarehouse {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn list_datasets(&self) -> Result<Vec<String>> {
        let conn = self.pool.get().await.context("Failed to get DB connection")?;
        let rows = conn
            .query("SELECT schema_name FROM information_schema.schemata ORDER BY schema_name", &[])
            .await
            .context("Failed to list schemas")?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn create_dataset(&self, dataset_name: &str) -> Result<()> {
        let conn = self.pool.get().await.context("Failed to get DB connection")?;
        conn.batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(dataset_name)))
            .await
            .with_context(|| format!("Failed to create schema {}", dataset_name))?;
        Ok(())
    }

    async fn start_load(&self, request: LoadRequest) -> Result<LoadJob> {
        let job = LoadJob {
            job_id: Uuid::new_v4().to_string(),
            table_id: request.table_id.clone(),
        };
        info!("Load job {}: {} rows into {}", job.job_id, request.rows.len(), job.table_id);
        let handle = tokio::spawn(run_load(self.pool.clone(), request));
        self.track(&job.job_id, handle).await;
        Ok(job)
    }

    /// A job is forgotten once its terminal state has been reported.
    async fn job_state(&self, job: &LoadJob) -> Result<JobState> {
        let mut running = self.running.lock().await;
        let handle = match running.remove(&job.job_id) {
            Some(handle) if !handle.is_finished() => {
                running.insert(job.job_id.clone(), handle);
                return Ok(JobState::Running);
            }
            Some(handle) => handle,
            None => return Err(anyhow!("Unknown load job {}", job.job_id)),
        };
        drop(running);

        let state = match handle.await {
            Ok(Ok(copied)) => {
                debug!("Load job {} copied {} rows", job.job_id, copied);
                JobState::Done { error: None }
            }
            Ok(Err(e)) => JobState::Done {
                error: Some(format!("{:#}", e)),
            },
            Err(e) => JobState::Done {
                error: Some(format!("Load task did not complete: {}", e)),
            },
        };
        Ok(state)
    }

    async fn table_row_count(&self, table_id: &TableId) -> Result<u64> {
        let conn = self.pool.get().await.context("Failed to get DB connection")?;
        let row = conn
            .query_one(
                &format!("SELECT COUNT(*) FROM {}", qualified_name(&table_id.dataset, &table_id.table)),
                &[],
            )
            .await
            .with_context(|| format!("Failed to count rows of {}", table_id))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn fetch_table(&self, table_id: &TableId) -> Result<Vec<TimeEntry>> {
        let conn = self.pool.get().await.context("Failed to get DB connection")?;
        let params: [&(dyn ToSql + Sync); 2] = [&table_id.dataset, &table_id.table];
        let exists: bool = conn
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
                &params,
            )
            .await
            .context("Failed to check table existence")?
            .get(0);
        if !exists {
            return Err(anyhow!("Table {} does not exist", table_id));
        }

        let rows = conn
            .query(
                &format!(
                    "SELECT \"user\", hours, project, \"timestamp\" FROM {}",
                    qualified_name(&table_id.dataset, &table_id.table)
                ),
                &[],
            )
            .await
            .with_context(|| format!("Failed to read {}", table_id))?;

        let entries: Vec<TimeEntry> = rows
            .iter()
            .map(|row| TimeEntry {
                user: row.get("user"),
                hours: row.get::<_, Option<f64>>("hours").unwrap_or(f64::NAN),
                project: row.get::<_, Option<String>>("project").unwrap_or_default(),
                timestamp: row.get("timestamp"),
            })
            .collect();
        info!("Read {} rows from {}", entries.len(), table_id);
        Ok(entries)
    }
}
