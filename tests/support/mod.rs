use std::sync::Arc;

use homelink_server::{AppState, MarketplaceDb, Settings};
use sqlx::postgres::PgPoolOptions;

/// App state over a lazily connected pool: no query ever runs in these
/// tests, so no database needs to be listening.
pub fn test_state() -> AppState {
    let config = Settings::new().expect("Failed to load settings");
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("Failed to create lazy pool");

    AppState::from_parts(config, MarketplaceDb::new(Arc::new(pool)))
        .expect("Failed to build app state")
}
