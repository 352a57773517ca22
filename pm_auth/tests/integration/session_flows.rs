use crate::common::{INITIAL_PASSWORD, TestAccounts, TestBackend, WRONG_PASSWORD};
use pm_auth::{Role, SessionError, TokenKind};

/// Session lifecycle flows
///
/// Login, token rotation, logout and lockout as seen by a client of the
/// public API.

/// Flow: provision → login → verify access → refresh → old refresh rejected → logout
#[tokio::test]
async fn test_full_session_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    let account = backend.provision(TestAccounts::manager()).await?;

    // Step 1: login
    let first = backend
        .manager
        .login(TestAccounts::manager().email, INITIAL_PASSWORD)
        .await?;
    assert_eq!(first.account.id, account.id);
    assert!(first.account.requires_password_change);
    assert!(first.account.last_login.is_some());

    // Step 2: the access token identifies the account
    let claims = backend
        .manager
        .verify_access_token(&first.tokens.access.value)?;
    assert_eq!(claims.user_id, account.id);
    assert_eq!(claims.sub, account.id);
    assert_eq!(claims.role, Role::Manager);
    assert_eq!(claims.typ, TokenKind::Access);

    // Step 3: rotate
    let second = backend.manager.refresh(&first.tokens.refresh.value).await?;
    assert_ne!(second.tokens.refresh.value, first.tokens.refresh.value);

    // Step 4: the retired refresh token is refused
    let replay = backend.manager.refresh(&first.tokens.refresh.value).await;
    assert_eq!(replay.unwrap_err(), SessionError::InvalidRefreshToken);

    // Step 5: logout revokes the current one too
    backend.manager.logout(&account.id).await?;
    let after_logout = backend.manager.refresh(&second.tokens.refresh.value).await;
    assert_eq!(after_logout.unwrap_err(), SessionError::InvalidRefreshToken);

    Ok(())
}

#[tokio::test]
async fn test_new_login_supersedes_previous_session() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    backend.provision(TestAccounts::member()).await?;
    let email = TestAccounts::member().email;

    let first = backend.manager.login(email, INITIAL_PASSWORD).await?;
    let second = backend.manager.login(email, INITIAL_PASSWORD).await?;

    // Only one refresh token is live per account
    let stale = backend.manager.refresh(&first.tokens.refresh.value).await;
    assert_eq!(stale.unwrap_err(), SessionError::InvalidRefreshToken);
    assert!(backend.manager.refresh(&second.tokens.refresh.value).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    let account = backend.provision(TestAccounts::member()).await?;
    let email = TestAccounts::member().email;

    for attempt in 1..=5 {
        let result = backend.manager.login(email, WRONG_PASSWORD).await;
        assert_eq!(
            result.unwrap_err(),
            SessionError::InvalidCredentials,
            "attempt {attempt} should be a plain credential failure"
        );
    }

    let locked = backend.manager.login(email, INITIAL_PASSWORD).await;
    assert_eq!(locked.unwrap_err(), SessionError::AccountLocked);

    let stored = backend
        .store
        .find_by_id(&account.id)
        .await?
        .ok_or("account should exist")?;
    assert_eq!(stored.login_attempts, 5);
    assert!(stored.lock_until.is_some());

    Ok(())
}

#[tokio::test]
async fn test_unknown_and_wrong_password_are_indistinguishable()
-> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    backend.provision(TestAccounts::admin()).await?;

    let unknown = backend
        .manager
        .login("stranger@example.com", INITIAL_PASSWORD)
        .await
        .unwrap_err();
    let wrong = backend
        .manager
        .login(TestAccounts::admin().email, WRONG_PASSWORD)
        .await
        .unwrap_err();

    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), wrong.to_string());

    Ok(())
}

#[tokio::test]
async fn test_tokens_from_other_secrets_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    backend.provision(TestAccounts::member()).await?;
    let outcome = backend
        .manager
        .login(TestAccounts::member().email, INITIAL_PASSWORD)
        .await?;

    // A second deployment with different secrets
    let other = TestBackend::with_store(
        backend.store.clone(),
        {
            let mut config = crate::common::test_setup::test_config();
            config.token = pm_auth::TokenConfig::new("other-access", "other-refresh")?;
            config
        },
    );

    assert_eq!(
        other
            .manager
            .verify_access_token(&outcome.tokens.access.value)
            .unwrap_err(),
        SessionError::TokenInvalid
    );
    assert_eq!(
        other
            .manager
            .refresh(&outcome.tokens.refresh.value)
            .await
            .unwrap_err(),
        SessionError::TokenInvalid
    );

    Ok(())
}
