//! Request-surface tests that resolve before any database round-trip:
//! missing credentials, malformed bodies, rejected form input.

use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use homelink_server::{auth, bookings, matching, payments, requests};
use serde_json::json;

mod support;

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .route("/auth/register", web::post().to(auth::handlers::register))
                .service(
                    web::scope("/api")
                        .service(
                            web::resource("/requests")
                                .route(web::post().to(requests::create_request))
                                .route(web::get().to(requests::list_requests)),
                        )
                        .route("/bookings", web::post().to(bookings::create_booking))
                        .route(
                            "/missions/{id}/respond",
                            web::post().to(matching::handlers::respond_mission),
                        )
                        .route("/payments", web::get().to(payments::handlers::list_payments)),
                ),
        )
    };
}

#[actix_web::test]
async fn test_get_routes_require_bearer_token() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    for uri in ["/api/requests", "/api/payments"] {
        let resp = test::TestRequest::get().uri(uri).send_request(&app).await;
        assert_eq!(resp.status(), 401, "GET {} should demand authentication", uri);
    }
}

#[actix_web::test]
async fn test_create_request_requires_bearer_token() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    // A well-formed body, so the only thing wrong is the missing token
    let resp = test::TestRequest::post()
        .uri("/api/requests")
        .set_json(json!({
            "category": "cleaning",
            "description": "Deep clean",
            "location": "Lyon",
            "budget": "90.00"
        }))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_create_booking_requires_bearer_token() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    let resp = test::TestRequest::post()
        .uri("/api/bookings")
        .set_json(json!({
            "provider_id": "5f64a1d2-9c1e-4d2e-bb6c-0a1f1c2d3e4f",
            "category": "gardening",
            "scheduled_for": (Utc::now() + Duration::days(2)).to_rfc3339(),
            "address": "8 avenue du Parc, Nantes",
            "price": "150.00"
        }))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_register_rejects_invalid_email() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    let resp = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "email": "not-an-email",
            "password": "password123"
        }))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("invalid email"));
}

#[actix_web::test]
async fn test_register_rejects_short_password() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    let resp = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "email": "client@example.com",
            "password": "short"
        }))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_register_rejects_admin_role() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    let resp = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "email": "boss@example.com",
            "password": "password123",
            "role": "admin"
        }))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_mission_response_rejects_unknown_action() {
    let state = web::Data::new(support::test_state());
    let app = test_app!(state).await;

    // The action discriminator is checked while the body is deserialized,
    // before the handler runs at all.
    let resp = test::TestRequest::post()
        .uri("/api/missions/5f64a1d2-9c1e-4d2e-bb6c-0a1f1c2d3e4f/respond")
        .set_json(json!({"action": "snooze"}))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 400);
}
