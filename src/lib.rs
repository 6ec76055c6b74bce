pub mod admin;
pub mod auth;
pub mod bookings;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod notify;
pub mod payments;
pub mod providers;
pub mod requests;

use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpResponse;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, RateLimitConfig, RateLimiter};
pub use db::MarketplaceDb;
use notify::EmailNotifier;
use payments::PaymentClient;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db: MarketplaceDb,
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub payments: Arc<PaymentClient>,
    pub mailer: Option<Arc<EmailNotifier>>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let db = MarketplaceDb::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_seconds),
        )
        .await?;

        Self::from_parts(config, db)
    }

    /// Wires the services around an existing pool. Tests hand in a lazily
    /// connected pool here.
    pub fn from_parts(config: Settings, db: MarketplaceDb) -> Result<Self> {
        let auth_service = Arc::new(AuthService::new(
            db.clone(),
            config.auth.jwt_secret.clone(),
            config.auth.token_expiry_hours,
        ));
        let payments = Arc::new(PaymentClient::new(
            &config.payments.base_url,
            config.payments.api_key.clone(),
        )?);
        let mailer = EmailNotifier::from_settings(&config.email).map(Arc::new);
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));

        Ok(Self {
            config: Arc::new(config),
            db,
            auth_service,
            rate_limiter,
            payments,
            mailer,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Close database connections
        self.db.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_app_state_from_parts() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");
        let state = AppState::from_parts(config, MarketplaceDb::new(Arc::new(pool)))
            .expect("state should build without touching the database");

        assert!(state.mailer.is_none());

        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
    }

    #[tokio::test]
    async fn test_health_check_shape() {
        let resp = health_check().await;
        assert!(resp.status().is_success());
    }
}
