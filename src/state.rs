use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::{
    auth::repo::{PgUserStore, UserStore},
    config::AppConfig,
    mail::{LogMailer, Mailer, SmtpMailer},
    packages::repo::{PackageStore, PgPackageStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub packages: Arc<dyn PackageStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let mailer = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?) as Arc<dyn Mailer>,
            None => {
                warn!("SMTP_HOST not set; reset emails will only be logged");
                Arc::new(LogMailer) as Arc<dyn Mailer>
            }
        };

        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgPackageStore::new(db)),
            mailer,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        packages: Arc<dyn PackageStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            packages,
            mailer,
        }
    }
}
