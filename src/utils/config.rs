// src/utils/config.rs - Warehouse target (dataset and table names)

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::env;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WarehouseTarget {
    #[serde(rename = "tm_dataset")]
    pub dataset_name: String,
    #[serde(rename = "tm_table")]
    pub table_name: String,
}

impl WarehouseTarget {
    pub fn new(dataset_name: &str, table_name: &str) -> Self {
        Self {
            dataset_name: dataset_name.to_string(),
            table_name: table_name.to_string(),
        }
    }

    /// Reads `tm_dataset` / `tm_table` from a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let target: WarehouseTarget = serde_json::from_str(text).context("Failed to parse warehouse config")?;
        target.validate()?;
        Ok(target)
    }

    /// Reads `TM_DATASET` / `TM_TABLE` from the environment.
    pub fn from_env() -> Result<Self> {
        let dataset_name = env::var("TM_DATASET").context("TM_DATASET is not set")?;
        let table_name = env::var("TM_TABLE").context("TM_TABLE is not set")?;
        let target = Self {
            dataset_name,
            table_name,
        };
        target.validate()?;
        Ok(target)
    }

    /// Config file when it exists, environment otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let target = if path.exists() {
            debug!("Loading warehouse target from {}", path.display());
            Self::from_json_file(path)?
        } else {
            debug!("{} not found, reading warehouse target from environment", path.display());
            Self::from_env()?
        };
        info!(
            "Warehouse target: dataset={}, table={}",
            target.dataset_name, target.table_name
        );
        Ok(target)
    }

    fn validate(&self) -> Result<()> {
        if self.dataset_name.trim().is_empty() {
            return Err(anyhow!("Warehouse dataset name is empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(anyhow!("Warehouse table name is empty"));
        }
        Ok(())
    }
}
