//! Shared fixtures for unit tests across the crate

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::config::{AuthConfig, TokenConfig};
use crate::password::MIN_BCRYPT_COST;
use crate::session::{ResetNotifier, SessionManager};
use crate::userdb::{Account, CredentialStore, InMemoryCredentialStore, NewAccount, Role, SanitizedAccount};

/// Password accepted by the strength rules, used for seeded accounts.
pub(crate) const TEST_PASSWORD: &str = "Password123";

pub(crate) fn test_token_config() -> TokenConfig {
    TokenConfig::new("test-access-secret", "test-refresh-secret")
        .expect("distinct non-empty secrets are valid")
}

/// Default configuration with the cheapest bcrypt cost so tests stay fast.
pub(crate) fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::new(test_token_config());
    config.bcrypt_cost = MIN_BCRYPT_COST;
    config
}

/// An in-memory account that was never persisted.
pub(crate) fn sample_account(email: &str, role: Role) -> Account {
    Account::provision(
        NewAccount {
            email: email.to_string(),
            name: "Sample".to_string(),
            role,
            password_hash: "not-a-real-digest".to_string(),
        },
        uuid::Uuid::new_v4().to_string(),
        Utc::now(),
    )
}

/// Captures every reset token handed to it.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) delivered: Mutex<Vec<(String, String, DateTime<Utc>)>>,
}

impl RecordingNotifier {
    pub(crate) async fn last_token(&self) -> Option<String> {
        self.delivered
            .lock()
            .await
            .last()
            .map(|(_, token, _)| token.clone())
    }

    pub(crate) async fn count(&self) -> usize {
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

pub(crate) struct TestContext {
    pub(crate) manager: SessionManager,
    pub(crate) store: Arc<InMemoryCredentialStore>,
    pub(crate) notifier: Arc<RecordingNotifier>,
}

impl TestContext {
    pub(crate) fn new() -> Self {
        Self::with_config(test_auth_config())
    }

    pub(crate) fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(InMemoryCredentialStore::new());
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

    /// Seed an active account whose password is [`TEST_PASSWORD`].
    pub(crate) async fn seed_account(&self, email: &str, role: Role) -> Account {
        let hash = bcrypt::hash(TEST_PASSWORD, MIN_BCRYPT_COST).expect("hashing should succeed");
        self.store
            .create_account(NewAccount {
                email: email.to_string(),
                name: "Seeded".to_string(),
                role,
                password_hash: hash,
            })
            .await
            .expect("seeding should succeed")
    }

    pub(crate) async fn stored(&self, id: &str) -> Account {
        self.store
            .find_by_id(id)
            .await
            .expect("lookup should succeed")
            .expect("account should exist")
    }
}
