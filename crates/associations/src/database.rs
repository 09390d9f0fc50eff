//! Database Integration - connection pool configuration for Postgres
//!
//! Provides the pool configuration and construction used by the Postgres
//! storage adapters.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::error::ModelError;

/// Database connection pool error types
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Connection acquisition failed: {0}")]
    AcquisitionFailed(#[from] sqlx::Error),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl From<PoolError> for ModelError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::AcquisitionFailed(sqlx_err) => {
                ModelError::Connection(format!("Database connection failed: {}", sqlx_err))
            }
            PoolError::ConfigurationError { message } => {
                ModelError::Connection(format!("Database configuration error: {}", message))
            }
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    /// Read the configuration from the `DATABASE_URL` environment variable
    pub fn from_env() -> Result<Self, PoolError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| PoolError::ConfigurationError {
            message: "DATABASE_URL is not set".to_string(),
        })?;
        Ok(Self { url })
    }
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub idle_timeout: Option<u64>,
    pub max_lifetime: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: 30,
            idle_timeout: Some(600),  // 10 minutes
            max_lifetime: Some(1800), // 30 minutes
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    fn options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout))
            .test_before_acquire(self.test_before_acquire);

        if let Some(idle_timeout) = self.idle_timeout {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }
        if let Some(max_lifetime) = self.max_lifetime {
            options = options.max_lifetime(Duration::from_secs(max_lifetime));
        }
        options
    }
}

/// Create a connection pool, establishing an initial connection
pub async fn create_pool(
    database: &DatabaseConfig,
    config: &PoolConfig,
) -> Result<Pool<Postgres>, PoolError> {
    tracing::debug!(
        "Creating database pool with config: max={}, min={}, timeout={}s",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout
    );

    let pool = config.options().connect(&database.url).await.map_err(|e| {
        tracing::error!("Failed to create database pool: {}", e);
        PoolError::AcquisitionFailed(e)
    })?;

    tracing::info!(
        "Database pool created with {} max connections",
        config.max_connections
    );
    Ok(pool)
}

/// Create a connection pool without connecting until first use
pub fn create_lazy_pool(
    database: &DatabaseConfig,
    config: &PoolConfig,
) -> Result<Pool<Postgres>, PoolError> {
    config
        .options()
        .connect_lazy(&database.url)
        .map_err(PoolError::AcquisitionFailed)
}
