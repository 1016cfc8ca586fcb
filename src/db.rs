use crate::config::AppConfig;
use crate::entities;
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::{debug, info};

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
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt)
        .await
        .map_err(ServiceError::DatabaseError)?;

    Ok(db_pool)
}

/// Establishes a connection using pool settings from the application config
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: cfg.database_url.clone(),
        max_connections: cfg.db_max_connections,
        min_connections: cfg.db_min_connections,
        connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
        idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
        acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
    };

    establish_connection_with_config(&config).await
}

/// Create missing tables from the entity definitions. Used for development
/// and the test harness; production schemas are managed externally.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), ServiceError> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(entities::UploadedFile),
        schema.create_table_from_entity(entities::User),
        schema.create_table_from_entity(entities::Product),
        schema.create_table_from_entity(entities::Order),
        schema.create_table_from_entity(entities::OrderItem),
    ];

    for stmt in &mut statements {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }

    info!("Database schema ensured");
    Ok(())
}
