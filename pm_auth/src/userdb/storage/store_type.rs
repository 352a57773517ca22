use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::storage::{DataStore, validate_table_name};
use crate::userdb::{
    errors::UserError,
    types::{Account, NewAccount, normalize_email},
};

use super::postgres::*;
use super::sqlite::*;
use super::traits::CredentialStore;

/// Credential store backed by a SQLite or PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct SqlCredentialStore {
    store: Arc<dyn DataStore>,
    table_name: String,
}

impl SqlCredentialStore {
    /// `table_name` is interpolated into SQL and must be a plain identifier.
    pub fn new(store: Arc<dyn DataStore>, table_name: impl Into<String>) -> Result<Self, UserError> {
        let table_name = table_name.into();
        validate_table_name(&table_name).map_err(UserError::InvalidData)?;
        Ok(Self { store, table_name })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

fn unsupported() -> UserError {
    UserError::Storage("Unsupported database type".to_string())
}

#[async_trait]
impl CredentialStore for SqlCredentialStore {
    /// Initialize the account table
    async fn init(&self) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        match (self.store.as_sqlite(), self.store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool, table).await?;
                validate_account_tables_sqlite(pool, table).await?;
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool, table).await?;
                validate_account_tables_postgres(pool, table).await?;
            }
            _ => return Err(unsupported()),
        }

        tracing::info!(table = %table, "Account table ready");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(account_id = %id))]
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            find_account_by_id_sqlite(pool, table, id).await
        } else if let Some(pool) = self.store.as_postgres() {
            find_account_by_id_postgres(pool, table, id).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, UserError> {
        let table = self.table_name.as_str();
        let email = normalize_email(email);

        let result = if let Some(pool) = self.store.as_sqlite() {
            find_account_by_email_sqlite(pool, table, &email).await
        } else if let Some(pool) = self.store.as_postgres() {
            find_account_by_email_postgres(pool, table, &email).await
        } else {
            Err(unsupported())
        };

        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "Account lookup completed"),
            Err(e) => tracing::error!(error = %e, "Account lookup failed"),
        }

        result
    }

    #[tracing::instrument(skip(self, token))]
    async fn find_by_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            find_account_by_refresh_token_sqlite(pool, table, token, now).await
        } else if let Some(pool) = self.store.as_postgres() {
            find_account_by_refresh_token_postgres(pool, table, token, now).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, token))]
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            find_account_by_reset_token_sqlite(pool, table, token, now).await
        } else if let Some(pool) = self.store.as_postgres() {
            find_account_by_reset_token_postgres(pool, table, token, now).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, new), fields(role = %new.role))]
    async fn create_account(&self, new: NewAccount) -> Result<Account, UserError> {
        let table = self.table_name.as_str();
        let account = Account::provision(new, uuid::Uuid::new_v4().to_string(), Utc::now());

        if let Some(pool) = self.store.as_sqlite() {
            insert_account_sqlite(pool, table, &account).await?;
        } else if let Some(pool) = self.store.as_postgres() {
            insert_account_postgres(pool, table, &account).await?;
        } else {
            return Err(unsupported());
        }

        tracing::info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    #[tracing::instrument(skip(self), fields(account_id = %id))]
    async fn update_login_attempts(
        &self,
        id: &str,
        attempts: u32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            update_login_attempts_sqlite(pool, table, id, attempts, lock_until).await
        } else if let Some(pool) = self.store.as_postgres() {
            update_login_attempts_postgres(pool, table, id, attempts, lock_until).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self), fields(account_id = %id))]
    async fn record_successful_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            record_successful_login_sqlite(pool, table, id, at).await
        } else if let Some(pool) = self.store.as_postgres() {
            record_successful_login_postgres(pool, table, id, at).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, token), fields(account_id = %id, clear = token.is_none()))]
    async fn set_refresh_token(
        &self,
        id: &str,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            set_refresh_token_sqlite(pool, table, id, token).await
        } else if let Some(pool) = self.store.as_postgres() {
            set_refresh_token_postgres(pool, table, id, token).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, token), fields(account_id = %id, clear = token.is_none()))]
    async fn set_reset_token(
        &self,
        id: &str,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            set_reset_token_sqlite(pool, table, id, token).await
        } else if let Some(pool) = self.store.as_postgres() {
            set_reset_token_postgres(pool, table, id, token).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, password_hash), fields(account_id = %id))]
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            update_password_sqlite(pool, table, id, password_hash).await
        } else if let Some(pool) = self.store.as_postgres() {
            update_password_postgres(pool, table, id, password_hash).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self, token, password_hash))]
    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            consume_reset_token_sqlite(pool, table, token, password_hash, now).await
        } else if let Some(pool) = self.store.as_postgres() {
            consume_reset_token_postgres(pool, table, token, password_hash, now).await
        } else {
            Err(unsupported())
        }
    }

    #[tracing::instrument(skip(self), fields(account_id = %id))]
    async fn set_requires_password_change(&self, id: &str, flag: bool) -> Result<(), UserError> {
        let table = self.table_name.as_str();

        if let Some(pool) = self.store.as_sqlite() {
            set_requires_password_change_sqlite(pool, table, id, flag).await
        } else if let Some(pool) = self.store.as_postgres() {
            set_requires_password_change_postgres(pool, table, id, flag).await
        } else {
            Err(unsupported())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DataStoreConfig, DataStoreKind};
    use crate::userdb::Role;
    use chrono::Duration;

    async fn sqlite_store() -> SqlCredentialStore {
        let data_store = DataStoreConfig::new(DataStoreKind::Sqlite, "sqlite::memory:")
            .connect()
            .await
            .expect("sqlite memory should connect");
        let store =
            SqlCredentialStore::new(data_store, "test_accounts").expect("valid table name");
        store.init().await.expect("init should succeed");
        store
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            name: "Sql User".to_string(),
            role: Role::Manager,
            password_hash: "digest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = sqlite_store().await;
        store.init().await.expect("second init should succeed");
        assert_eq!(store.table_name(), "test_accounts");
    }

    #[tokio::test]
    async fn test_rejects_unsafe_table_name() {
        let data_store = DataStoreConfig::new(DataStoreKind::Sqlite, "sqlite::memory:")
            .connect()
            .await
            .expect("sqlite memory should connect");

        let result = SqlCredentialStore::new(data_store, "accounts; DROP TABLE accounts");
        assert!(matches!(result, Err(UserError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_create_and_lookup_roundtrip() {
        // Given a provisioned account
        let store = sqlite_store().await;
        let created = store
            .create_account(new_account("Sql@Example.com"))
            .await
            .expect("create should succeed");

        // When reading it back by id and by differently-cased email
        let by_id = store
            .find_by_id(&created.id)
            .await
            .expect("lookup")
            .expect("account exists");
        let by_email = store
            .find_by_email("SQL@example.COM")
            .await
            .expect("lookup")
            .expect("account exists");

        // Then the stored record matches what was provisioned
        assert_eq!(by_id.id, created.id);
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_id.email, "sql@example.com");
        assert_eq!(by_id.role, Role::Manager);
        assert!(by_id.is_active);
        assert!(by_id.requires_password_change);
        assert_eq!(by_id.login_attempts, 0);
        assert_eq!(by_id.lock_until, None);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_already_exists() {
        let store = sqlite_store().await;
        store
            .create_account(new_account("twice@example.com"))
            .await
            .expect("first create should succeed");

        let result = store.create_account(new_account("Twice@Example.com")).await;
        assert!(matches!(result, Err(UserError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_expiry_is_enforced() {
        let store = sqlite_store().await;
        let account = store
            .create_account(new_account("tok@example.com"))
            .await
            .expect("create");
        let now = Utc::now();

        store
            .set_refresh_token(&account.id, Some(("refresh-1", now + Duration::days(7))))
            .await
            .expect("set token");
        let found = store
            .find_by_refresh_token("refresh-1", now)
            .await
            .expect("lookup");
        assert_eq!(found.map(|a| a.id), Some(account.id.clone()));

        let later = now + Duration::days(7) + Duration::seconds(1);
        assert!(
            store
                .find_by_refresh_token("refresh-1", later)
                .await
                .expect("lookup")
                .is_none()
        );

        store
            .set_refresh_token(&account.id, None)
            .await
            .expect("clear token");
        assert!(
            store
                .find_by_refresh_token("refresh-1", now)
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_lockout_bookkeeping() {
        let store = sqlite_store().await;
        let account = store
            .create_account(new_account("lock@example.com"))
            .await
            .expect("create");
        let until = Utc::now() + Duration::minutes(15);

        store
            .update_login_attempts(&account.id, 5, Some(until))
            .await
            .expect("update attempts");
        let locked = store
            .find_by_id(&account.id)
            .await
            .expect("lookup")
            .expect("account exists");
        assert_eq!(locked.login_attempts, 5);
        assert_eq!(
            locked.lock_until.map(|t| t.timestamp_millis()),
            Some(until.timestamp_millis())
        );

        let login_at = Utc::now();
        store
            .record_successful_login(&account.id, login_at)
            .await
            .expect("record login");
        let unlocked = store
            .find_by_id(&account.id)
            .await
            .expect("lookup")
            .expect("account exists");
        assert_eq!(unlocked.login_attempts, 0);
        assert_eq!(unlocked.lock_until, None);
        assert!(unlocked.last_login.is_some());
    }

    #[tokio::test]
    async fn test_consume_reset_token_once() {
        let store = sqlite_store().await;
        let account = store
            .create_account(new_account("reset@example.com"))
            .await
            .expect("create");
        let now = Utc::now();
        store
            .set_reset_token(&account.id, Some(("reset-1", now + Duration::hours(1))))
            .await
            .expect("set reset token");

        assert!(
            store
                .find_by_reset_token("reset-1", now)
                .await
                .expect("lookup")
                .is_some()
        );

        let first = store
            .consume_reset_token("reset-1", "new-digest", now)
            .await
            .expect("consume");
        let second = store
            .consume_reset_token("reset-1", "newer-digest", now)
            .await
            .expect("consume");

        assert_eq!(first, Some(account.id.clone()));
        assert_eq!(second, None);

        let stored = store
            .find_by_id(&account.id)
            .await
            .expect("lookup")
            .expect("account exists");
        assert_eq!(stored.password_hash, "new-digest");
        assert!(!stored.requires_password_change);
        assert_eq!(stored.password_reset_token, None);
        assert_eq!(stored.password_reset_expires, None);
    }

    #[tokio::test]
    async fn test_expired_reset_token_not_consumed() {
        let store = sqlite_store().await;
        let account = store
            .create_account(new_account("expired@example.com"))
            .await
            .expect("create");
        let now = Utc::now();
        store
            .set_reset_token(&account.id, Some(("reset-2", now - Duration::minutes(1))))
            .await
            .expect("set reset token");

        let consumed = store
            .consume_reset_token("reset-2", "new-digest", now)
            .await
            .expect("consume");
        assert_eq!(consumed, None);
        assert!(
            store
                .find_by_reset_token("reset-2", now)
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_password_flags() {
        let store = sqlite_store().await;
        let account = store
            .create_account(new_account("flags@example.com"))
            .await
            .expect("create");

        store
            .update_password(&account.id, "digest-2")
            .await
            .expect("update password");
        let stored = store
            .find_by_id(&account.id)
            .await
            .expect("lookup")
            .expect("account exists");
        assert_eq!(stored.password_hash, "digest-2");
        assert!(!stored.requires_password_change);

        store
            .set_requires_password_change(&account.id, true)
            .await
            .expect("set flag");
        let stored = store
            .find_by_id(&account.id)
            .await
            .expect("lookup")
            .expect("account exists");
        assert!(stored.requires_password_change);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = sqlite_store().await;
        assert_eq!(
            store.update_password("nope", "digest").await,
            Err(UserError::NotFound)
        );
        assert_eq!(
            store.set_refresh_token("nope", None).await,
            Err(UserError::NotFound)
        );
    }
}
