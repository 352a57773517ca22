mod config;
mod types;

pub use config::{DEFAULT_TABLE_PREFIX, DataStoreConfig, DataStoreKind};
pub use types::{DataStore, PostgresDataStore, SqliteDataStore};
