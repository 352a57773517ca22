use crate::common::{INITIAL_PASSWORD, NEXT_PASSWORD, TestAccounts, TestBackend, WRONG_PASSWORD};
use pm_auth::{SessionError, UserError};

/// The same flows against the SQLite backend
///
/// Exercises timestamp comparison, the atomic reset consumption and the
/// unique email constraint through real SQL.

#[tokio::test]
async fn test_sqlite_session_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::sqlite().await?;
    let account = backend.provision(TestAccounts::admin()).await?;
    let email = TestAccounts::admin().email;

    let first = backend.manager.login(email, INITIAL_PASSWORD).await?;
    let second = backend.manager.refresh(&first.tokens.refresh.value).await?;

    assert_eq!(
        backend
            .manager
            .refresh(&first.tokens.refresh.value)
            .await
            .unwrap_err(),
        SessionError::InvalidRefreshToken
    );

    backend.manager.logout(&account.id).await?;
    assert_eq!(
        backend
            .manager
            .refresh(&second.tokens.refresh.value)
            .await
            .unwrap_err(),
        SessionError::InvalidRefreshToken
    );

    Ok(())
}

#[tokio::test]
async fn test_sqlite_lockout_and_counter_reset() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::sqlite().await?;
    let account = backend.provision(TestAccounts::member()).await?;
    let email = TestAccounts::member().email;

    for _ in 0..3 {
        let _ = backend.manager.login(email, WRONG_PASSWORD).await;
    }
    let stored = backend
        .store
        .find_by_id(&account.id)
        .await?
        .ok_or("account should exist")?;
    assert_eq!(stored.login_attempts, 3);

    backend.manager.login(email, INITIAL_PASSWORD).await?;
    let stored = backend
        .store
        .find_by_id(&account.id)
        .await?
        .ok_or("account should exist")?;
    assert_eq!(stored.login_attempts, 0);
    assert_eq!(stored.lock_until, None);

    Ok(())
}

#[tokio::test]
async fn test_sqlite_reset_flow() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::sqlite().await?;
    backend.provision(TestAccounts::manager()).await?;
    let email = TestAccounts::manager().email;

    backend.manager.forgot_password(email).await?;
    let token = backend
        .notifier
        .token_for(email)
        .await
        .ok_or("reset token should be delivered")?;

    assert!(backend.manager.validate_reset_token(&token).await?.is_valid);
    backend.manager.reset_password(&token, NEXT_PASSWORD).await?;
    assert!(!backend.manager.validate_reset_token(&token).await?.is_valid);
    assert!(backend.manager.login(email, NEXT_PASSWORD).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_sqlite_duplicate_email_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::sqlite().await?;
    backend.provision(TestAccounts::member()).await?;

    let duplicate = backend
        .manager
        .provision_account(
            "MEMBER@example.com",
            "Someone Else",
            pm_auth::Role::User,
            INITIAL_PASSWORD,
        )
        .await;

    match duplicate {
        Err(SessionError::Storage(detail)) => {
            assert!(detail.contains("already exists"), "unexpected detail: {detail}")
        }
        other => panic!("Expected storage error, got {other:?}"),
    }

    // The store itself reports the conflict precisely
    let direct = backend
        .store
        .create_account(pm_auth::NewAccount {
            email: "member@example.com".to_string(),
            name: "Again".to_string(),
            role: pm_auth::Role::User,
            password_hash: "digest".to_string(),
        })
        .await;
    assert!(matches!(direct, Err(UserError::AlreadyExists(_))));

    Ok(())
}
