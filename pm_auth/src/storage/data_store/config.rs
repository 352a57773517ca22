//! Database connection configuration

use std::{str::FromStr, sync::Arc};

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::types::{DataStore, PostgresDataStore, SqliteDataStore};
use crate::storage::errors::StorageError;
use crate::storage::validate_table_name;

/// Prefix used for table names when `DB_TABLE_PREFIX` is not set
pub const DEFAULT_TABLE_PREFIX: &str = "pm_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStoreKind {
    Sqlite,
    Postgres,
}

impl FromStr for DataStoreKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" => Ok(Self::Postgres),
            t => Err(StorageError::Config(format!(
                "Unsupported store type: {t}. Supported types are 'sqlite' and 'postgres'"
            ))),
        }
    }
}

/// Where the account table lives and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStoreConfig {
    pub kind: DataStoreKind,
    pub url: String,
    pub accounts_table: String,
}

impl DataStoreConfig {
    pub fn new(kind: DataStoreKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            accounts_table: format!("{DEFAULT_TABLE_PREFIX}accounts"),
        }
    }

    /// Read `GENERIC_DATA_STORE_TYPE`, `GENERIC_DATA_STORE_URL`,
    /// `DB_TABLE_PREFIX` and `DB_TABLE_ACCOUNTS` from the environment.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("GENERIC_DATA_STORE_TYPE")
            .ok_or_else(|| StorageError::Config("GENERIC_DATA_STORE_TYPE must be set".into()))?
            .parse()?;
        let url = lookup("GENERIC_DATA_STORE_URL")
            .ok_or_else(|| StorageError::Config("GENERIC_DATA_STORE_URL must be set".into()))?;

        let prefix =
            lookup("DB_TABLE_PREFIX").unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string());
        let accounts_table =
            lookup("DB_TABLE_ACCOUNTS").unwrap_or_else(|| format!("{prefix}accounts"));
        validate_table_name(&accounts_table).map_err(StorageError::Config)?;

        Ok(Self {
            kind,
            url,
            accounts_table,
        })
    }

    /// Open a connection pool for the configured backend.
    pub async fn connect(&self) -> Result<Arc<dyn DataStore>, StorageError> {
        tracing::info!(store_type = ?self.kind, "Initializing data store");

        let store: Arc<dyn DataStore> = match self.kind {
            DataStoreKind::Sqlite => {
                let opts = SqliteConnectOptions::from_str(&self.url)
                    .map_err(|e| StorageError::Config(e.to_string()))?
                    .create_if_missing(true);

                // An in-memory database lives only as long as its connection
                let pool = if is_sqlite_memory_url(&self.url) {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                        .connect_with(opts)
                        .await?
                } else {
                    SqlitePoolOptions::new().connect_with(opts).await?
                };

                Arc::new(SqliteDataStore::new(pool))
            }
            DataStoreKind::Postgres => {
                let pool = PgPoolOptions::new().connect(&self.url).await?;
                Arc::new(PostgresDataStore::new(pool))
            }
        };

        tracing::info!(store_type = ?self.kind, "Connected to database");
        Ok(store)
    }
}

fn is_sqlite_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
