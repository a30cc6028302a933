use std::{fmt, sync::Arc, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::{
    application::unit_of_work::AppUnitOfWork,
    database::infrastructure::postgres::{
        PostgresCatalogRepository, PostgresWatchRepository,
    },
    error::{CoreError, Result},
};

/// Statistics about the connection pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_size: u32,
}

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    catalog: PostgresCatalogRepository,
    watches: PostgresWatchRepository,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn connect(
        connection_string: &str,
        max_connections: u32,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| {
                CoreError::Internal(format!("Database connection failed: {}", e))
            })?;

        info!(
            "Database pool initialized with max_connections={}",
            max_connections
        );

        Ok(Self::from_pool(pool, max_connections))
    }

    /// Wraps an existing pool, e.g. one handed out by `#[sqlx::test]`.
    pub fn from_pool(pool: PgPool, max_connections: u32) -> Self {
        Self {
            catalog: PostgresCatalogRepository::new(pool.clone()),
            watches: PostgresWatchRepository::new(pool.clone()),
            pool,
            max_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_size: self.max_connections,
        }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR.run(&self.pool).await.map_err(|e| {
            CoreError::Internal(format!("Migration failed: {}", e))
        })?;

        info!("Database migrations applied");
        Ok(())
    }

    pub fn unit_of_work(&self) -> AppUnitOfWork {
        AppUnitOfWork {
            catalog: Arc::new(self.catalog.clone()),
            watches: Arc::new(self.watches.clone()),
        }
    }
}
