// src/utils/db_connect.rs

use anyhow::{Context, Result};
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::info;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Connection settings read from `POSTGRES_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl PgSettings {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("POSTGRES_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("POSTGRES_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(5432),
            dbname: std::env::var("POSTGRES_DB").unwrap_or_else(|_| "warehouse".to_string()),
            user: std::env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("POSTGRES_PASSWORD").unwrap_or_default(),
        }
    }

    fn to_config(&self) -> Config {
        info!(
            "DB Config: Host={}, Port={}, DB={}, User={}",
            self.host, self.port, self.dbname, self.user
        );
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password);
        config.application_name("timesheet_dedupe");
        config.connect_timeout(Duration::from_secs(10));
        config
    }
}

/// Initializes the database connection pool and checks it with a test query.
pub async fn connect(settings: &PgSettings) -> Result<PgPool> {
    info!("Connecting to PostgreSQL database...");
    let manager = PostgresConnectionManager::new(settings.to_config(), NoTls);

    let pool = Pool::builder()
        .max_size(4)
        .min_idle(Some(1))
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .context("Failed to build database connection pool")?;

    let conn = pool
        .get()
        .await
        .context("Failed to get test connection from pool")?;
    conn.query_one("SELECT 1", &[])
        .await
        .context("Test query 'SELECT 1' failed")?;
    drop(conn);
    info!("Database connection pool initialized successfully.");
    Ok(pool)
}

/// (total connections, idle connections, connections in use)
pub fn get_pool_status(pool: &PgPool) -> (u32, u32, u32) {
    let state = pool.state();
    (
        state.connections,
        state.idle_connections,
        state.connections.saturating_sub(state.idle_connections),
    )
}
