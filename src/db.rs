use std::{fmt::Display, future::Future, str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ConnectConfig;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE_TIMEOUT: Duration = Duration::from_secs(45);
const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Fixed-delay retry schedule for the startup connection.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<&ConnectConfig> for RetryPolicy {
    fn from(cfg: &ConnectConfig) -> Self {
        Self {
            attempts: cfg.attempts,
            delay: cfg.delay(),
        }
    }
}

/// Runs `op` until it succeeds or the policy runs out, sleeping `delay` between tries.
pub async fn retry_fixed<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max => {
                warn!(attempt, max, error = %e, "database connection attempt failed; retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn pool_options(acquire_timeout: Duration) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(acquire_timeout)
        .idle_timeout(IDLE_TIMEOUT)
}

/// Connects with retries. When every attempt fails the returned pool connects
/// lazily, so the server still comes up and requests fail until the database is back.
/// A URL that does not parse fails straight away.
pub async fn connect(url: &str, policy: RetryPolicy) -> anyhow::Result<(PgPool, ConnectionState)> {
    connect_within(url, policy, ACQUIRE_TIMEOUT).await
}

async fn connect_within(
    url: &str,
    policy: RetryPolicy,
    acquire_timeout: Duration,
) -> anyhow::Result<(PgPool, ConnectionState)> {
    let options = PgConnectOptions::from_str(url).context("invalid DATABASE_URL")?;

    let result = retry_fixed(policy, |attempt| {
        info!(attempt, "connecting to database");
        pool_options(acquire_timeout).connect_with(options.clone())
    })
    .await;

    match result {
        Ok(pool) => Ok((pool, ConnectionState::Connected)),
        Err(e) => {
            error!(attempts = policy.attempts, error = %e, "database unreachable; running without a connection");
            let pool = pool_options(acquire_timeout).connect_lazy_with(options);
            Ok((pool, ConnectionState::Disconnected))
        }
    }
}

/// Applies pending migrations. Failures are logged and reported as `false`.
pub async fn migrate(pool: &PgPool) -> bool {
    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("database migrations applied");
            true
        }
        Err(e) => {
            warn!(error = %e, "migration failed; continuing");
            false
        }
    }
}

pub async fn close(pool: &PgPool) {
    pool.close().await;
    info!("database connection closed");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    fn from_probe(result: &Result<(), sqlx::Error>) -> Self {
        match result {
            Ok(()) => Self::Connected,
            Err(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                Self::Disconnected
            }
            Err(_) => Self::Error,
        }
    }
}

/// Remembers the last observed state so each transition is logged once, and
/// whether the schema has been migrated yet.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    last: Option<ConnectionState>,
    migrated: bool,
}

impl ConnectionMonitor {
    pub fn new(initial: ConnectionState, migrated: bool) -> Self {
        Self {
            last: Some(initial),
            migrated,
        }
    }

    /// A degraded start skips migrations; they run on the first healthy probe.
    pub fn needs_migration(&self) -> bool {
        !self.migrated && self.last == Some(ConnectionState::Connected)
    }

    pub fn mark_migrated(&mut self) {
        self.migrated = true;
    }

    /// Returns true when `next` differs from the previous observation.
    pub fn observe(&mut self, next: ConnectionState) -> bool {
        if self.last == Some(next) {
            return false;
        }
        self.last = Some(next);
        true
    }
}

/// Periodically probes the pool and logs connected / disconnected / error transitions.
pub fn spawn_monitor(pool: PgPool, initial: ConnectionState, migrated: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut monitor = ConnectionMonitor::new(initial, migrated);
        let mut ticker = tokio::time::interval(MONITOR_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }
            let probe = sqlx::query("SELECT 1").execute(&pool).await.map(|_| ());
            let state = ConnectionState::from_probe(&probe);
            if monitor.observe(state) {
                match (state, probe) {
                    (ConnectionState::Connected, _) => info!("database connected"),
                    (ConnectionState::Disconnected, _) => warn!("database disconnected"),
                    (_, Err(e)) => error!(error = %e, "database connection error"),
                    (_, Ok(())) => {}
                }
            }
            if monitor.needs_migration() && migrate(&pool).await {
                monitor.mark_migrated();
            }
        }
    })
}
