pub mod config;
pub mod guard;
pub mod models;
pub mod routes;
pub mod schema;
pub mod scheduling;
pub mod services;

use mentora_shared::clients::db::DbPool;
use mentora_shared::middleware::{HasJwtSecret, JwtSecret};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::scheduling::{BusinessCalendar, MeetingLinks};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub jwt: JwtSecret,
    pub meeting_links: MeetingLinks,
    pub calendar: BusinessCalendar,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        metrics_handle: PrometheusHandle,
    ) -> anyhow::Result<Self> {
        let calendar = BusinessCalendar::from_offset_minutes(config.business_utc_offset_minutes)?;
        Ok(Self {
            db,
            jwt: JwtSecret::new(&config.jwt_secret),
            meeting_links: MeetingLinks::new(&config.meeting_base_url),
            calendar,
            config,
            metrics_handle,
        })
    }
}

impl HasJwtSecret for AppState {
    fn jwt_secret(&self) -> &JwtSecret {
        &self.jwt
    }
}
