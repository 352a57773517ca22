use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::userdb::{
    errors::UserError,
    types::{Account, NewAccount, normalize_email},
};

use super::traits::CredentialStore;

/// Credential store kept in process memory, keyed by account id.
///
/// Intended for tests and demos. Every operation holds the lock for its
/// whole duration, so reset-token redemption is atomic.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory credential store");
        Self::default()
    }

    async fn update<F>(&self, id: &str, apply: F) -> Result<(), UserError>
    where
        F: FnOnce(&mut Account) + Send,
    {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(id).ok_or(UserError::NotFound)?;
        apply(account);
        account.updated_at = Utc::now();
        Ok(())
    }

    /// Direct mutable access for tests that need to move stored instants around.
    #[cfg(test)]
    pub(crate) async fn edit_account<F>(&self, id: &str, apply: F) -> Result<(), UserError>
    where
        F: FnOnce(&mut Account) + Send,
    {
        self.update(id, apply).await
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn init(&self) -> Result<(), UserError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, UserError> {
        Ok(self.accounts.lock().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, UserError> {
        let email = normalize_email(email);
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, UserError> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|account| {
                account.refresh_token.as_deref() == Some(token)
                    && account.refresh_token_expires_at.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, UserError> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|account| {
                account.password_reset_token.as_deref() == Some(token)
                    && account.password_reset_expires.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn create_account(&self, new: NewAccount) -> Result<Account, UserError> {
        let mut accounts = self.accounts.lock().await;
        let email = normalize_email(&new.email);
        if accounts.values().any(|account| account.email == email) {
            return Err(UserError::AlreadyExists(email));
        }

        let account = Account::provision(new, uuid::Uuid::new_v4().to_string(), Utc::now());
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn update_login_attempts(
        &self,
        id: &str,
        attempts: u32,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), UserError> {
        self.update(id, |account| {
            account.login_attempts = attempts;
            account.lock_until = lock_until;
        })
        .await
    }

    async fn record_successful_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), UserError> {
        self.update(id, |account| {
            account.login_attempts = 0;
            account.lock_until = None;
            account.last_login = Some(at);
        })
        .await
    }

    async fn set_refresh_token(
        &self,
        id: &str,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), UserError> {
        let token = token.map(|(value, exp)| (value.to_string(), exp));
        self.update(id, |account| {
            account.refresh_token = token.as_ref().map(|(value, _)| value.clone());
            account.refresh_token_expires_at = token.map(|(_, exp)| exp);
        })
        .await
    }

    async fn set_reset_token(
        &self,
        id: &str,
        token: Option<(&str, DateTime<Utc>)>,
    ) -> Result<(), UserError> {
        let token = token.map(|(value, exp)| (value.to_string(), exp));
        self.update(id, |account| {
            account.password_reset_token = token.as_ref().map(|(value, _)| value.clone());
            account.password_reset_expires = token.map(|(_, exp)| exp);
        })
        .await
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), UserError> {
        let password_hash = password_hash.to_string();
        self.update(id, |account| {
            account.password_hash = password_hash;
            account.requires_password_change = false;
        })
        .await
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, UserError> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.values_mut().find(|account| {
            account.password_reset_token.as_deref() == Some(token)
                && account.password_reset_expires.is_some_and(|exp| exp > now)
        }) else {
            return Ok(None);
        };

        account.password_hash = password_hash.to_string();
        account.requires_password_change = false;
        account.password_reset_token = None;
        account.password_reset_expires = None;
        account.updated_at = Utc::now();
        Ok(Some(account.id.clone()))
    }

    async fn set_requires_password_change(&self, id: &str, flag: bool) -> Result<(), UserError> {
        self.update(id, |account| account.requires_password_change = flag)
            .await
    }
}
