use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
    /// Log every statement through sqlx
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
            sqlx_logging: false,
        }
    }
}

impl DbConfig {
    /// Single-connection pool over an in-memory SQLite database.
    ///
    /// Every in-memory SQLite connection is its own database, so the pool is
    /// pinned to one connection. Concurrent transactions queue on it.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError::DatabaseError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(config.sqlx_logging);

    gauge!("ams_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        ServiceError::db_error(e)
    })?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
            sqlx_logging: cfg.log_level.eq_ignore_ascii_case("trace"),
        }
    }
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Database access wrapper with built-in metrics and error handling
#[derive(Debug, Clone)]
pub struct DatabaseAccess {
    pool: Arc<DbPool>,
}

impl DatabaseAccess {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &DbPool {
        &self.pool
    }

    /// Opens a transaction for one lifecycle operation.
    ///
    /// The returned unit must be closed with [`UnitOfWork::finish`]. Dropping it
    /// without finishing rolls the transaction back.
    pub async fn begin(&self, operation: &'static str) -> Result<UnitOfWork, ServiceError> {
        let id = Uuid::new_v4();
        debug!(transaction_id = %id, operation, "Starting database transaction");
        counter!("ams_db.transaction.started", 1, "operation" => operation);

        let txn = self.pool.begin().await.map_err(|e| {
            error!(transaction_id = %id, operation, error = %e, "Failed to open transaction");
            ServiceError::db_error(e)
        })?;

        Ok(UnitOfWork {
            txn,
            operation,
            id,
            started: Instant::now(),
        })
    }
}

/// A single open transaction scoped to one operation.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    operation: &'static str,
    id: Uuid,
    started: Instant,
}

impl UnitOfWork {
    pub fn txn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits when `result` is `Ok`, otherwise rolls back and hands the error back.
    ///
    /// A failed rollback is logged; the caller still sees the failure it passed in.
    pub async fn finish<T>(self, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
        let UnitOfWork {
            txn,
            operation,
            id,
            started,
        } = self;

        let outcome = match result {
            Ok(value) => match txn.commit().await {
                Ok(()) => {
                    counter!("ams_db.transaction.committed", 1, "operation" => operation);
                    debug!(transaction_id = %id, operation, "Transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    error!(transaction_id = %id, operation, error = %e, "Transaction commit failed");
                    counter!("ams_db.transaction.commit_failed", 1, "operation" => operation);
                    Err(ServiceError::db_error(e))
                }
            },
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(
                        transaction_id = %id,
                        operation,
                        error = %rollback_err,
                        "Transaction rollback failed"
                    );
                }
                counter!("ams_db.transaction.rolled_back", 1, "operation" => operation);
                warn!(transaction_id = %id, operation, error = %err, "Transaction rolled back");
                Err(err)
            }
        };

        histogram!("ams_db.transaction.duration", started.elapsed(), "operation" => operation);
        outcome
    }
}

/// Runs database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::db_error);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    let start = Instant::now();

    let result = pool.ping().await.map_err(ServiceError::db_error);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("ams_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("ams_db.connection_failures", 1);
        }
    }

    result
}
