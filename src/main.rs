use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use homelink_server::{admin, auth, bookings, matching, payments, providers, requests};
use homelink_server::{AppError, AppState, Settings};
use std::net::TcpListener;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[actix_web::main]
async fn main() -> homelink_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    info!("Starting server at {}:{}", config.server.host, config.server.port);

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    let state = web::Data::new(state);

    // Bring the schema up to date before accepting traffic
    sqlx::migrate!()
        .run(state.db.pool())
        .await
        .map_err(|e| AppError::InternalError(format!("migration failed: {}", e)))?;
    info!("Database migrations applied");

    if state.mailer.is_none() {
        warn!("SMTP is not configured, notification emails are disabled");
    }

    // Ambient housekeeping only: expired sessions and stale rate-limit
    // windows. Mission deadlines are deliberately not handled here; they
    // are compared at read time by the handlers that touch the rows.
    let housekeeping = state.clone();
    tokio::spawn(async move {
        loop {
            match housekeeping.db.cleanup_expired_sessions().await {
                Ok(removed) if removed > 0 => {
                    info!("Removed {} expired sessions", removed);
                }
                Ok(_) => {}
                Err(e) => warn!("Session cleanup failed: {}", e),
            }
            housekeeping.rate_limiter.cleanup().await;

            tokio::time::sleep(Duration::from_secs(600)).await;
        }
    });

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    info!(
        "HomeLink API ready at http://{}:{}",
        config.server.host, config.server.port
    );

    // Start HTTP server
    HttpServer::new(move || {
        let cors = if config.cors.enabled {
            let cors_config = Cors::default();

            // Apply specific CORS rules based on configuration
            let cors_config = if config.cors.allow_any_origin {
                cors_config
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .expose_any_header()
            } else {
                // More restrictive CORS for production use
                let mut restricted = cors_config;
                for origin in &config.cors.allowed_origins {
                    restricted = restricted.allowed_origin(origin);
                }
                restricted
                    .allowed_methods(vec!["GET", "POST", "PUT"])
                    .allowed_headers(vec!["Authorization", "Content-Type"])
                    .supports_credentials()
            };

            // Set max age
            cors_config.max_age(config.cors.max_age as usize)
        } else {
            // CORS disabled - use most restrictive settings
            Cors::default()
        };

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .route("/health", web::get().to(homelink_server::health_check))
            .route("/auth/register", web::post().to(auth::handlers::register))
            .route("/auth/login", web::post().to(auth::handlers::login))
            .route("/auth/logout", web::post().to(auth::handlers::logout))
            .service(
                web::scope("/api")
                    .service(
                        web::resource("/requests")
                            .route(web::post().to(requests::create_request))
                            .route(web::get().to(requests::list_requests)),
                    )
                    .route("/requests/{id}/cancel", web::post().to(requests::cancel_request))
                    .service(
                        web::resource("/providers")
                            .route(web::post().to(providers::create_provider))
                            .route(web::get().to(providers::search_providers)),
                    )
                    .route("/providers/{id}", web::get().to(providers::get_provider))
                    .route("/providers/{id}/verify", web::post().to(providers::verify_provider))
                    .route(
                        "/providers/{id}/availability",
                        web::post().to(providers::set_availability),
                    )
                    .route("/missions", web::get().to(matching::handlers::list_missions))
                    .route("/missions/assign", web::post().to(matching::handlers::assign_mission))
                    .route(
                        "/missions/{id}/respond",
                        web::post().to(matching::handlers::respond_mission),
                    )
                    .route(
                        "/missions/{id}/reassign",
                        web::post().to(matching::handlers::reassign_mission),
                    )
                    .service(
                        web::resource("/bookings")
                            .route(web::post().to(bookings::create_booking))
                            .route(web::get().to(bookings::list_bookings)),
                    )
                    .route("/bookings/{id}", web::get().to(bookings::get_booking))
                    .route(
                        "/bookings/{id}/status",
                        web::post().to(bookings::update_booking_status),
                    )
                    .route("/bookings/{id}/rate", web::post().to(bookings::rate_booking))
                    .route(
                        "/payments/capture",
                        web::post().to(payments::handlers::capture_payment),
                    )
                    .route("/payments", web::get().to(payments::handlers::list_payments))
                    .route(
                        "/payments/{id}/refund",
                        web::post().to(payments::handlers::refund_payment),
                    )
                    .service(
                        web::resource("/admin/rules")
                            .route(web::get().to(payments::handlers::list_rules))
                            .route(web::put().to(payments::handlers::upsert_rule)),
                    )
                    .route("/admin/audit", web::get().to(admin::list_audit)),
            )
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
