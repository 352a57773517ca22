mod data_store;
mod errors;
mod schema_validation;

pub use data_store::{
    DEFAULT_TABLE_PREFIX, DataStore, DataStoreConfig, DataStoreKind, PostgresDataStore,
    SqliteDataStore,
};
pub use errors::StorageError;

pub(crate) use schema_validation::{
    validate_postgres_table_schema, validate_sqlite_table_schema, validate_table_name,
};
