use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, sqlite::SqliteQueryResult};

use crate::storage::validate_sqlite_table_schema;
use crate::userdb::{
    errors::UserError,
    types::{Account, AccountRow},
};

// SQLite implementations. Instants are stored as RFC 3339 text and compared
// through julianday() so differing fractional precision orders correctly.
pub(super) async fn create_tables_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT true,
            login_attempts INTEGER NOT NULL DEFAULT 0,
            lock_until TIMESTAMP,
            last_login TIMESTAMP,
            refresh_token TEXT,
            refresh_token_expires_at TIMESTAMP,
            password_reset_token TEXT,
            password_reset_expires TIMESTAMP,
            requires_password_change BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
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
pub(super) async fn validate_account_tables_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
) -> Result<(), UserError> {
    let expected_columns = [
        ("id", "TEXT"),
        ("email", "TEXT"),
        ("name", "TEXT"),
        ("role", "TEXT"),
        ("password_hash", "TEXT"),
        ("is_active", "BOOLEAN"),
        ("login_attempts", "INTEGER"),
        ("lock_until", "TIMESTAMP"),
        ("last_login", "TIMESTAMP"),
        ("refresh_token", "TEXT"),
        ("refresh_token_expires_at", "TIMESTAMP"),
        ("password_reset_token", "TEXT"),
        ("password_reset_expires", "TIMESTAMP"),
        ("requires_password_change", "BOOLEAN"),
        ("created_at", "TIMESTAMP"),
        ("updated_at", "TIMESTAMP"),
    ];

    validate_sqlite_table_schema(pool, table_name, &expected_columns, UserError::Storage).await
}

pub(super) async fn find_account_by_id_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
) -> Result<Option<Account>, UserError> {
    let sql = format!("SELECT * FROM {table_name} WHERE id = ?");
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub(super) async fn find_account_by_email_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    email: &str,
) -> Result<Option<Account>, UserError> {
    let sql = format!("SELECT * FROM {table_name} WHERE email = ?");
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub(super) async fn find_account_by_refresh_token_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Account>, UserError> {
    let sql = format!(
        r#"
        SELECT * FROM {table_name}
        WHERE refresh_token = ? AND julianday(refresh_token_expires_at) > julianday(?)
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

pub(super) async fn find_account_by_reset_token_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Account>, UserError> {
    let sql = format!(
        r#"
        SELECT * FROM {table_name}
        WHERE password_reset_token = ? AND julianday(password_reset_expires) > julianday(?)
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

pub(super) async fn insert_account_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    account: &Account,
) -> Result<(), UserError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (
            id, email, name, role, password_hash, is_active, login_attempts,
            requires_password_change, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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

fn ensure_updated(result: SqliteQueryResult) -> Result<(), UserError> {
    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }
    Ok(())
}

pub(super) async fn update_login_attempts_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    attempts: u32,
    lock_until: Option<DateTime<Utc>>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        "UPDATE {table_name} SET login_attempts = ?, lock_until = ?, updated_at = ? WHERE id = ?"
    ))
    .bind(i64::from(attempts))
    .bind(lock_until)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn record_successful_login_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    at: DateTime<Utc>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET login_attempts = 0, lock_until = NULL, last_login = ?, updated_at = ?
        WHERE id = ?
        "#
    ))
    .bind(at)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn set_refresh_token_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    token: Option<(&str, DateTime<Utc>)>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET refresh_token = ?, refresh_token_expires_at = ?, updated_at = ?
        WHERE id = ?
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

pub(super) async fn set_reset_token_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    token: Option<(&str, DateTime<Utc>)>,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET password_reset_token = ?, password_reset_expires = ?, updated_at = ?
        WHERE id = ?
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

pub(super) async fn update_password_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    password_hash: &str,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name}
        SET password_hash = ?, requires_password_change = false, updated_at = ?
        WHERE id = ?
        "#
    ))
    .bind(password_hash)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}

pub(super) async fn consume_reset_token_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    token: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, UserError> {
    let id: Option<String> = sqlx::query_scalar(&format!(
        r#"
        UPDATE {table_name}
        SET password_hash = ?,
            requires_password_change = false,
            password_reset_token = NULL,
            password_reset_expires = NULL,
            updated_at = ?
        WHERE password_reset_token = ? AND julianday(password_reset_expires) > julianday(?)
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

pub(super) async fn set_requires_password_change_sqlite(
    pool: &Pool<Sqlite>,
    table_name: &str,
    id: &str,
    flag: bool,
) -> Result<(), UserError> {
    let result = sqlx::query(&format!(
        "UPDATE {table_name} SET requires_password_change = ?, updated_at = ? WHERE id = ?"
    ))
    .bind(flag)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result)
}
