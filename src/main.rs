mod admin;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod mail;
mod packages;
mod state;
mod users;

#[cfg(test)]
mod testing;

use crate::{
    config::AppConfig,
    db::{ConnectionState, RetryPolicy},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tripdesk=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "invalid configuration"))?;
    let addr = app::bind_addr(&config)?;

    let (pool, conn_state) = db::connect(&config.database_url, RetryPolicy::from(&config.connect)).await?;

    let migrated = conn_state == ConnectionState::Connected && {
        tracing::info!("database connected");
        db::migrate(&pool).await
    };
    let monitor = db::spawn_monitor(pool.clone(), conn_state, migrated);

    let state = AppState::init(config, pool.clone())?;
    let app = app::build_app(state);

    let served = app::serve(app, addr).await;

    monitor.abort();
    db::close(&pool).await;
    served
}
