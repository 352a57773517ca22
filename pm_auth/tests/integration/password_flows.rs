use crate::common::{INITIAL_PASSWORD, NEXT_PASSWORD, TestAccounts, TestBackend};
use pm_auth::{ResetTokenStatus, SessionError};

/// Password change and reset flows

/// Flow: provision → login → change password → old session gone → login with new password
#[tokio::test]
async fn test_first_login_password_change() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    let account = backend.provision(TestAccounts::member()).await?;
    let email = TestAccounts::member().email;

    let outcome = backend.manager.login(email, INITIAL_PASSWORD).await?;
    assert!(outcome.account.requires_password_change);

    backend
        .manager
        .change_password(&account.id, INITIAL_PASSWORD, NEXT_PASSWORD)
        .await?;

    let revoked = backend.manager.refresh(&outcome.tokens.refresh.value).await;
    assert_eq!(revoked.unwrap_err(), SessionError::InvalidRefreshToken);

    let relogin = backend.manager.login(email, NEXT_PASSWORD).await?;
    assert!(!relogin.account.requires_password_change);

    // An admin can demand another change
    backend.manager.force_password_change(&account.id).await?;
    let current = backend.manager.current_account(&account.id).await?;
    assert!(current.requires_password_change);

    Ok(())
}

/// Flow: forgot → validate → reset → token spent → login with new password
#[tokio::test]
async fn test_forgot_and_reset_password() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();
    backend.provision(TestAccounts::manager()).await?;
    let email = TestAccounts::manager().email;

    backend.manager.forgot_password(email).await?;
    let token = backend
        .notifier
        .token_for(email)
        .await
        .ok_or("reset token should be delivered")?;

    let status = backend.manager.validate_reset_token(&token).await?;
    assert_eq!(
        status,
        ResetTokenStatus {
            is_valid: true,
            email: Some(email.to_string()),
        }
    );

    backend.manager.reset_password(&token, NEXT_PASSWORD).await?;

    assert!(!backend.manager.validate_reset_token(&token).await?.is_valid);
    assert_eq!(
        backend
            .manager
            .reset_password(&token, "Another789")
            .await
            .unwrap_err(),
        SessionError::InvalidOrExpiredResetToken
    );
    assert!(backend.manager.login(email, NEXT_PASSWORD).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_registration()
-> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();

    backend
        .manager
        .forgot_password("nobody@example.com")
        .await?;

    assert_eq!(backend.notifier.count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_reset_token_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
    let backend = TestBackend::in_memory();

    let status = backend.manager.validate_reset_token("0".repeat(32).as_str()).await?;
    assert!(!status.is_valid);
    assert_eq!(status.email, None);
    assert_eq!(
        serde_json::to_value(&status)?,
        serde_json::json!({ "isValid": false })
    );

    Ok(())
}
