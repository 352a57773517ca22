use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, postgres::PgQueryResult};

use crate::storage::validate_postgres_table_schema;
use crate::userdb::{
    errors::UserError,
    types::{Account, AccountRow},
};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            login_attempts BIGINT NOT NULL DEFAULT 0,
            lock_until TIMESTAMPTZ,
            last_login TIMESTAMPTZ,
            refresh_token TEXT,
            refresh_token_expires_at TIMESTAMPTZ,
            password_reset_token TEXT,
            password_reset_expires TIMESTAMPTZ,
            requires_password_change BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table_name}_refresh_token ON {table_name}(refresh_token)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table_name}_reset_token ON {table_name}(password_reset_token)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Validates that the account table schema matches what we expect
pub(super) async fn validate_account_tables_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
) -> Result<(), UserError> {
    let expected_columns = [
        ("id", "text"),
        ("email", "text"),
        ("name", "text"),
        ("role", "text"),
        ("password_hash", "text"),
        ("is_active", "boolean"),
        ("login_attempts", "bigint"),
        ("lock_until", "timestamp with time zone"),
        ("last_login", "timestamp with time zone"),
        ("refresh_token", "text"),
        ("refresh_token_expires_at", "timestamp with time zone"),
        ("password_reset_token", "text"),
        ("password_reset_expires", "timestamp with time zone"),
        ("requires_password_change", "boolean"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(pool, table_name, &expected_columns, UserError::Storage).await
}

pub(super) async fn find_account_by_id_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
) -> Result<Option<Account>, UserError> {
    let sql = format!("SELECT * FROM {table_name} WHERE id = $1");
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub(super) async fn find_account_by_email_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    email: &str,
) -> Result<Option<Account>, UserError> {
    let sql = format!("SELECT * FROM {table_name} WHERE email = $1");
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub(super) async fn find_account_by_refresh_token_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Account>, UserError> {
    let sql = format!(
        r#"
        SELECT * FROM {table_name}
        WHERE refresh_token = $1 AND refresh_token_expires_at > $2
        "#
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub(super) async fn find_account_by_reset_token_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Account>, UserError> {
    let sql = format!(
        r#"
        SELECT * FROM {table_name}
        WHERE password_reset_token = $1 AND password_reset_expires > $2
        "#
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(token)
        .bind(now)
        .fetch_optional(pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub(super) async fn insert_account_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    account: &Account,
) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (
            id, email, name, role, password_hash, is_active, login_attempts,
            requires_password_change, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#
    ))
    .bind(&account.id)
    .bind(&account.email)
    .bind(&account.name)
    .bind(account.role.as_str())
    .bind(&account.password_hash)
    .bind(account.is_active)
    .bind(i64::from(account.login_attempts))
    .bind(account.requires_password_change)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

fn ensure_updated(result: PgQueryResult) -> Result<(), UserError> {
    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }
    Ok(())
}

pub(super) async fn update_login_attempts_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    attempts: u32,
    lock_until: Option<DateTime<Utc>>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        "UPDATE {table_name} SET login_attempts = $1, lock_until = $2, updated_at = $3 WHERE id = $4"
    ))
    .bind(i64::from(attempts))
    .bind(lock_until)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn record_successful_login_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    at: DateTime<Utc>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET login_attempts = 0, lock_until = NULL, last_login = $1, updated_at = $2
        WHERE id = $3
        "#
    ))
    .bind(at)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn set_refresh_token_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    token: Option<(&str, DateTime<Utc>)>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET refresh_token = $1, refresh_token_expires_at = $2, updated_at = $3
        WHERE id = $4
        "#
    ))
    .bind(token.map(|(value, _)| value))
    .bind(token.map(|(_, exp)| exp))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn set_reset_token_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    token: Option<(&str, DateTime<Utc>)>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET password_reset_token = $1, password_reset_expires = $2, updated_at = $3
        WHERE id = $4
        "#
    ))
    .bind(token.map(|(value, _)| value))
    .bind(token.map(|(_, exp)| exp))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn update_password_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    password_hash: &str,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET password_hash = $1, requires_password_change = FALSE, updated_at = $2
        WHERE id = $3
        "#
    ))
    .bind(password_hash)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn consume_reset_token_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    token: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, UserError> {
    let id: Option<String> = sqlx::query_scalar(&format!(
        r#"
        UPDATE {table_name}
        SET password_hash = $1,
            requires_password_change = FALSE,
            password_reset_token = NULL,
            password_reset_expires = NULL,
            updated_at = $2
        WHERE password_reset_token = $3 AND password_reset_expires > $4
        RETURNING id
        "#
    ))
    .bind(password_hash)
    .bind(Utc::now())
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

pub(super) async fn set_requires_password_change_postgres(
    pool: &Pool<Postgres>,
    table_name: &str,
    id: &str,
    flag: bool,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        "UPDATE {table_name} SET requires_password_change = $1, updated_at = $2 WHERE id = $3"
    ))
    .bind(flag)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}
