use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_FRONTEND_BASE_URL: &str = "https://tripdesk.travel";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl ConnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_base_url: String,
    pub production: bool,
    pub jwt: JwtConfig,
    pub smtp: Option<SmtpConfig>,
    pub connect: ConnectConfig,
}

fn var_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get(key).unwrap_or_else(|| default.into())
}

fn var_parse<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get(key).and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .context("DATABASE_URL must be set")?;

        let secret = match get("JWT_SECRET") {
            Some(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set; falling back to an insecure development secret");
                "dev-secret".into()
            }
        };
        let jwt = JwtConfig {
            secret,
            issuer: var_or(&get, "JWT_ISSUER", "tripdesk"),
            audience: var_or(&get, "JWT_AUDIENCE", "tripdesk-users"),
            ttl_minutes: var_parse(&get, "ACCESS_TOKEN_TTL_MINUTES", 60),
            reset_ttl_minutes: var_parse(&get, "RESET_TOKEN_TTL_MINUTES", 15),
        };

        // SMTP is optional; without a host, mail goes to the log instead.
        let smtp = get("SMTP_HOST").filter(|h| !h.is_empty()).map(|host| {
            let user = var_or(&get, "SMTP_USER", "");
            SmtpConfig {
                port: var_parse(&get, "SMTP_PORT", 587),
                pass: var_or(&get, "SMTP_PASS", ""),
                from: get("SMTP_FROM").unwrap_or_else(|| user.clone()),
                user,
                host,
            }
        });

        Ok(Self {
            database_url,
            host: var_or(&get, "APP_HOST", "0.0.0.0"),
            port: var_parse(&get, "PORT", 5000),
            frontend_base_url: var_or(&get, "FRONTEND_BASE_URL", DEFAULT_FRONTEND_BASE_URL),
            production: var_or(&get, "APP_ENV", "development") == "production",
            jwt,
            smtp,
            connect: ConnectConfig {
                attempts: var_parse(&get, "DB_CONNECT_ATTEMPTS", 5),
                delay_secs: var_parse(&get, "DB_CONNECT_DELAY_SECS", 5),
            },
        })
    }

    pub fn environment(&self) -> &'static str {
        if self.production {
            "production"
        } else {
            "development"
        }
    }

    /// Frontend URL that resets land on, with any trailing slash dropped.
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_base_url.trim_end_matches('/'),
            token
        )
    }
}
