mod server;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use pm_auth::{
    AuthConfig, CredentialStore as _, DataStoreConfig, ResetLinkLogger, Role, SessionManager,
    SqlCredentialStore,
};
use pm_auth_axum::{AuthState, CookieConfig, pm_auth_router};

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create the first administrator from `ADMIN_EMAIL` / `ADMIN_PASSWORD`
/// (and optionally `ADMIN_NAME`) unless that email is already registered.
async fn provision_admin(manager: &SessionManager) -> Result<(), Box<dyn std::error::Error>> {
    let (Ok(email), Ok(password)) = (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD"))
    else {
        tracing::debug!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin provisioning");
        return Ok(());
    };

    if manager.store().find_by_email(&email).await?.is_some() {
        tracing::info!("Admin account already present");
        return Ok(());
    }

    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());
    let account = manager
        .provision_account(&email, &name, Role::Admin, &password)
        .await?;
    tracing::info!(account_id = %account.id, "Provisioned admin account");
    Ok(())
}

fn frontend_url() -> String {
    std::env::var("FRONTEND_URL").unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string())
}

fn cors_layer() -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let origin = frontend_url();

    // Cookies are sent cross-origin only to the one configured frontend
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    server::init_tracing("demo_server");

    let auth_config = AuthConfig::from_env()?;
    let store_config = DataStoreConfig::from_env()?;

    let data_store = store_config.connect().await?;
    let store = SqlCredentialStore::new(data_store, store_config.accounts_table.clone())?;
    store.init().await?;

    let mut manager = SessionManager::new(auth_config, Arc::new(store))?;
    if std::env::var("PM_AUTH_LOG_RESET_LINKS").is_ok_and(|v| v == "true") {
        tracing::warn!("PM_AUTH_LOG_RESET_LINKS is on: reset links are written to the log");
        manager = manager.with_notifier(Arc::new(ResetLinkLogger::new(frontend_url())));
    }
    provision_admin(&manager).await?;

    let state = AuthState::new(manager, CookieConfig::from_env());

    let app = Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", pm_auth_router(state))
        .layer(cors_layer()?);

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse()?,
        Err(_) => DEFAULT_PORT,
    };

    server::serve_http(port, app).await?;
    Ok(())
}
