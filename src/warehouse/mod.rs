// src/warehouse/mod.rs - Warehouse sink: dataset checks, partitioned full-replace loads, reads
#![allow(async_fn_in_trait)]

pub mod postgres;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;

use crate::models::core::{TimeEntry, DATE_FIELDS, TIME_ENTRY_COLUMNS};
use crate::models::stats_models::WriteOutcome;
use crate::utils::config::WarehouseTarget;

pub const NO_ROWS_MESSAGE: &str = "No dataframe to be transferred";
pub const DEFAULT_DATE_FIELD: &str = "timestamp";
const LOAD_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Fully qualified `project.dataset.table` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub project_id: String,
    pub dataset: String,
    pub table: String,
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset, self.table)
    }
}

pub fn generate_table_id(project_id: &str, dataset_name: &str, table_name: &str) -> TableId {
    TableId {
        project_id: project_id.to_string(),
        dataset: dataset_name.to_string(),
        table: table_name.to_string(),
    }
}

/// A truncate-and-load request, partitioned by day on `partition_field`.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub table_id: TableId,
    pub partition_field: String,
    pub rows: Vec<TimeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    pub job_id: String,
    pub table_id: TableId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done { error: Option<String> },
}

/// Authenticated handle to a warehouse.
pub trait WarehouseClient {
    fn project_id(&self) -> &str;
    async fn list_datasets(&self) -> Result<Vec<String>>;
    async fn create_dataset(&self, dataset_name: &str) -> Result<()>;
    async fn start_load(&self, request: LoadRequest) -> Result<LoadJob>;
    async fn job_state(&self, job: &LoadJob) -> Result<JobState>;
    async fn table_row_count(&self, table_id: &TableId) -> Result<u64>;
    async fn fetch_table(&self, table_id: &TableId) -> Result<Vec<TimeEntry>>;
}

/// Capability that turns credentials into a client.
pub trait WarehouseConnector {
    type Client: WarehouseClient;
    async fn authenticate(&self) -> Result<Self::Client>;
}

/// Creates the dataset if it does not exist yet.
pub async fn check_dataset<C: WarehouseClient>(client: &C, dataset_name: &str) -> Result<()> {
    let datasets = client.list_datasets().await.context("Failed to list datasets")?;
    if datasets.iter().any(|d| d == dataset_name) {
        info!("{} already in warehouse", dataset_name);
        return Ok(());
    }

    client
        .create_dataset(dataset_name)
        .await
        .with_context(|| format!("Failed to create dataset {}", dataset_name))?;
    info!("Created dataset {}.{}", client.project_id(), dataset_name);
    let datasets = client.list_datasets().await.context("Failed to list datasets")?;
    debug!("Updated warehouse datasets: {:?}", datasets);
    Ok(())
}

/// Full-replace load of `entries`, partitioned per day on `date_field`.
pub async fn write_table<C: WarehouseClient>(
    entries: &[TimeEntry],
    client: &C,
    target: &WarehouseTarget,
    date_field: &str,
) -> Result<WriteOutcome> {
    write_table_polling(entries, client, target, date_field, LOAD_POLL_INTERVAL).await
}

async fn write_table_polling<C: WarehouseClient>(
    entries: &[TimeEntry],
    client: &C,
    target: &WarehouseTarget,
    date_field: &str,
    poll_interval: Duration,
) -> Result<WriteOutcome> {
    if entries.is_empty() {
        return Ok(WriteOutcome::failed(NO_ROWS_MESSAGE));
    }
    if !DATE_FIELDS.contains(&date_field) {
        return Err(anyhow!(
            "Cannot partition on '{}': expected one of {:?}",
            date_field,
            DATE_FIELDS
        ));
    }

    let table_id = generate_table_id(client.project_id(), &target.dataset_name, &target.table_name);
    let job = client
        .start_load(LoadRequest {
            table_id: table_id.clone(),
            partition_field: date_field.to_string(),
            rows: entries.to_vec(),
        })
        .await
        .with_context(|| format!("Failed to start load into {}", table_id))?;
    debug!("Started load job {} for {}", job.job_id, table_id);

    loop {
        match client.job_state(&job).await? {
            JobState::Done { error: Some(error) } => {
                warn!("Load job {} failed: {}", job.job_id, error);
                return Ok(WriteOutcome::failed(error));
            }
            JobState::Done { error: None } => break,
            state => {
                debug!("Load job {} is {:?}", job.job_id, state);
                tokio::time::sleep(poll_interval).await;
            }
        }
    }

    let num_rows = client
        .table_row_count(&table_id)
        .await
        .with_context(|| format!("Failed to read row count of {}", table_id))?;
    info!(
        "Loaded {} rows and {} columns to {}",
        num_rows,
        TIME_ENTRY_COLUMNS.len(),
        table_id
    );
    if num_rows == entries.len() as u64 {
        Ok(WriteOutcome::succeeded())
    } else {
        warn!("{} rows sent but {} rows in {}", entries.len(), num_rows, table_id);
        Ok(WriteOutcome {
            success: false,
            error: None,
        })
    }
}

/// Authenticate, make sure the dataset exists, then load.
pub async fn write_process<W: WarehouseConnector>(
    entries: &[TimeEntry],
    connector: &W,
    target: &WarehouseTarget,
    date_field: &str,
) -> Result<WriteOutcome> {
    if entries.is_empty() {
        return Ok(WriteOutcome::failed(NO_ROWS_MESSAGE));
    }
    let client = connector
        .authenticate()
        .await
        .context("Failed to authenticate to warehouse")?;
    check_dataset(&client, &target.dataset_name).await?;
    write_table(entries, &client, target, date_field).await
}

/// Reads the whole target table back.
pub async fn query_table<W: WarehouseConnector>(connector: &W, target: &WarehouseTarget) -> Result<Vec<TimeEntry>> {
    let client = connector
        .authenticate()
        .await
        .context("Failed to authenticate to warehouse")?;
    let table_id = generate_table_id(client.project_id(), &target.dataset_name, &target.table_name);
    client
        .fetch_table(&table_id)
        .await
        .with_context(|| format!("Failed to query {}", table_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeState {
        datasets: Vec<String>,
        tables: HashMap<TableId, Vec<TimeEntry>>,
        polls_left: usize,
        pending: Option<(LoadJob, LoadRequest)>,
    }

    struct FakeWarehouse {
        state: Arc<Mutex<FakeState>>,
        polls_before_done: usize,
        fail_with: Option<String>,
        drop_rows: usize,
    }

    impl FakeWarehouse {
        fn new(state: Arc<Mutex<FakeState>>) -> Self {
            Self {
                state,
                polls_before_done: 2,
                fail_with: None,
                drop_rows: 0,
            }
        }
    }

    impl WarehouseClient for FakeWarehouse {
        fn project_id(&self) -> &str {
            "test-project"
        }

        async fn list_datasets(&self) -> Result<Vec<String>> {
            Ok(self.state.lock().unwrap().datasets.clone())
        }

        async fn create_dataset(&self, dataset_name: &str) -> Result<()> {
            self.state.lock().unwrap().datasets.push(dataset_name.to_string());
            Ok(())
        }

        async fn start_load(&self, request: LoadRequest) -> Result<LoadJob> {
            let job = LoadJob {
                job_id: "job-1".to_string(),
                table_id: request.table_id.clone(),
            };
            let mut state = self.state.lock().unwrap();
            state.polls_left = self.polls_before_done;
            state.pending = Some((job.clone(), request));
            Ok(job)
        }

        async fn job_state(&self, _job: &LoadJob) -> Result<JobState> {
            let mut state = self.state.lock().unwrap();
            if state.polls_left > 0 {
                state.polls_left -= 1;
                return Ok(JobState::Running);
            }
            if let Some(error) = &self.fail_with {
                return Ok(JobState::Done { error: Some(error.clone()) });
            }
            if let Some((job, mut request)) = state.pending.take() {
                let keep = request.rows.len().saturating_sub(self.drop_rows);
                request.rows.truncate(keep);
                state.tables.insert(job.table_id, request.rows);
            }
            Ok(JobState::Done { error: None })
        }

        async fn table_row_count(&self, table_id: &TableId) -> Result<u64> {
            let state = self.state.lock().unwrap();
            Ok(state.tables.get(table_id).map_or(0, |rows| rows.len() as u64))
        }

        async fn fetch_table(&self, table_id: &TableId) -> Result<Vec<TimeEntry>> {
            let state = self.state.lock().unwrap();
            state
                .tables
                .get(table_id)
                .cloned()
                .ok_or_else(|| anyhow!("Not found: {}", table_id))
        }
    }

    struct FakeConnector {
        state: Arc<Mutex<FakeState>>,
        authentications: AtomicUsize,
    }

    impl FakeConnector {
        fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeState::default())),
                authentications: AtomicUsize::new(0),
            }
        }
    }

    impl WarehouseConnector for FakeConnector {
        type Client = FakeWarehouse;

        async fn authenticate(&self) -> Result<FakeWarehouse> {
            self.authentications.fetch_add(1, Ordering::SeqCst);
            Ok(FakeWarehouse::new(self.state.clone()))
        }
    }

    fn rows() -> Vec<TimeEntry> {
        let ts = chrono::NaiveDate::from_ymd_opt(2023, 10, 25).and_then(|d| d.and_hms_opt(12, 0, 0));
        vec![
            TimeEntry::new(Some("ana"), 2.0, "transit", ts),
            TimeEntry::new(Some("ben"), 1.0, "hiring", ts),
        ]
    }

    fn target() -> WarehouseTarget {
        WarehouseTarget::new("timesheets", "entries")
    }

    #[test]
    fn test_table_id_format() {
        assert_eq!(
            generate_table_id("proj", "timesheets", "entries").to_string(),
            "proj.timesheets.entries"
        );
    }

    #[tokio::test]
    async fn test_empty_dataset_never_contacts_warehouse() {
        let connector = FakeConnector::new();
        let outcome = write_process(&[], &connector, &target(), DEFAULT_DATE_FIELD).await.unwrap();
        assert_eq!(outcome, WriteOutcome::failed(NO_ROWS_MESSAGE));
        assert_eq!(connector.authentications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_dataset_creates_once() {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let client = FakeWarehouse::new(state.clone());
        check_dataset(&client, "timesheets").await.unwrap();
        check_dataset(&client, "timesheets").await.unwrap();
        assert_eq!(state.lock().unwrap().datasets, vec!["timesheets".to_string()]);
    }

    #[tokio::test]
    async fn test_write_polls_until_done_and_verifies_rows() {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let client = FakeWarehouse::new(state.clone());
        let outcome = write_table_polling(&rows(), &client, &target(), DEFAULT_DATE_FIELD, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::succeeded());
        assert_eq!(state.lock().unwrap().polls_left, 0);
    }

    #[tokio::test]
    async fn test_row_count_mismatch_is_unsuccessful() {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let mut client = FakeWarehouse::new(state);
        client.drop_rows = 1;
        let outcome = write_table_polling(&rows(), &client, &target(), DEFAULT_DATE_FIELD, Duration::from_millis(1))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn test_failed_job_reports_error() {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let mut client = FakeWarehouse::new(state);
        client.fail_with = Some("quota exceeded".to_string());
        let outcome = write_table_polling(&rows(), &client, &target(), DEFAULT_DATE_FIELD, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::failed("quota exceeded"));
    }

    #[tokio::test]
    async fn test_unknown_partition_field_is_error() {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let client = FakeWarehouse::new(state);
        let result = write_table_polling(&rows(), &client, &target(), "project", Duration::from_millis(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_write_then_query_round_trip() {
        let connector = FakeConnector::new();
        let client = connector.authenticate().await.unwrap();
        let outcome = write_table_polling(&rows(), &client, &target(), DEFAULT_DATE_FIELD, Duration::from_millis(1))
            .await
            .unwrap();
        assert!(outcome.success);

        let fetched = query_table(&connector, &target()).await.unwrap();
        assert_eq!(fetched, rows());
        assert_eq!(connector.authentications.load(Ordering::SeqCst), 2);
    }
}
