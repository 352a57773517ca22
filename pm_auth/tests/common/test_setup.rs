use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use pm_auth::{
    AuthConfig, CredentialStore, DataStoreConfig, DataStoreKind, InMemoryCredentialStore,
    ResetNotifier, SanitizedAccount, SessionManager, SqlCredentialStore, TokenConfig,
};

use super::fixtures::{INITIAL_PASSWORD, TestAccount};

/// Captures delivered reset tokens in place of an email channel
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, String, DateTime<Utc>)>>,
}

impl RecordingNotifier {
    pub async fn token_for(&self, email: &str) -> Option<String> {
        self.delivered
            .lock()
            .await
            .iter()
            .rev()
            .find(|(to, _, _)| to == email)
            .map(|(_, token, _)| token.clone())
    }

    pub async fn count(&self) -> usize {
        self.delivered.lock().await.len()
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn deliver(
        &self,
        account: &SanitizedAccount,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), String> {
        self.delivered
            .lock()
            .await
            .push((account.email.clone(), token.to_string(), expires_at));
        Ok(())
    }
}

pub fn test_config() -> AuthConfig {
    let token = TokenConfig::new("integration-access-secret", "integration-refresh-secret")
        .expect("distinct secrets are valid");
    let mut config = AuthConfig::new(token);
    config.bcrypt_cost = pm_auth::MIN_BCRYPT_COST;
    config
}

/// A session manager wired to a fresh store and a recording notifier
pub struct TestBackend {
    pub manager: SessionManager,
    pub store: Arc<dyn CredentialStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestBackend {
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemoryCredentialStore::new()), test_config())
    }

    pub async fn sqlite() -> Result<Self, Box<dyn std::error::Error>> {
        let data_store = DataStoreConfig::new(DataStoreKind::Sqlite, "sqlite::memory:")
            .connect()
            .await?;
        let store = SqlCredentialStore::new(data_store, "it_accounts")?;
        store.init().await?;
        Ok(Self::with_store(Arc::new(store), test_config()))
    }

    pub fn with_store(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = SessionManager::new(config, store.clone())
            .expect("test configuration is valid")
            .with_notifier(notifier.clone());

        Self {
            manager,
            store,
            notifier,
        }
    }

    pub async fn provision(
        &self,
        account: TestAccount,
    ) -> Result<SanitizedAccount, Box<dyn std::error::Error>> {
        let created = self
            .manager
            .provision_account(account.email, account.name, account.role, INITIAL_PASSWORD)
            .await?;
        Ok(created)
    }
}
