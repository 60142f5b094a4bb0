//! Connection pool management with read/write separation
//!
//! Write traffic (pipeline mutations) and read traffic (status queries,
//! completion counts) run on separate pools so a burst of one cannot
//! starve the other.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use docpipe_config::DatabaseConfig;

/// Sizing for the two pools
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections for write operations
    pub write_pool_size: u32,
    /// Maximum connections for read operations
    pub read_pool_size: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout: u64,
    /// Idle timeout in seconds
    pub idle_timeout: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            write_pool_size: 5,
            read_pool_size: 10,
            connect_timeout: 30,
            idle_timeout: 600,
        }
    }
}

/// Holds the write and read pools
#[derive(Clone)]
pub struct PoolManager {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PoolManager {
    /// Connect both pools
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable, credentials are
    /// rejected, or either pool fails to connect within the timeout.
    pub async fn new(db_config: &DatabaseConfig, config: PoolConfig) -> Result<Self> {
        let base_options = db_config.connect_options().application_name("docpipe");

        let write_pool = PgPoolOptions::new()
            .max_connections(config.write_pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect_with(base_options.clone())
            .await
            .context("Failed to create write pool")?;

        let read_pool = PgPoolOptions::new()
            .max_connections(config.read_pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect_with(base_options)
            .await
            .context("Failed to create read pool")?;

        Ok(Self {
            write_pool,
            read_pool,
        })
    }

    /// Pool for pipeline mutations
    pub const fn write_pool(&self) -> &PgPool {
        &self.write_pool
    }

    /// Pool for queries and lookups
    pub const fn read_pool(&self) -> &PgPool {
        &self.read_pool
    }
}
