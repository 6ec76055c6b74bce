//! Provider profile handlers: creation, browsing, admin verification,
//! availability.

use actix_web::{web, HttpRequest, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{authenticate_request, require_role};
use crate::db::models::{Provider, Role};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::AppState;

/// Running average over completed bookings. `completed` already includes
/// the booking being scored.
pub fn updated_rating(current: f64, completed: i32, score: u8) -> f64 {
    if completed <= 1 {
        return f64::from(score);
    }
    let prior = completed as f64 - 1.0;
    (current * prior + f64::from(score)) / completed as f64
}

#[derive(Debug, Deserialize)]
pub struct CreateProviderPayload {
    pub category: String,
    pub hourly_rate: Decimal,
    pub service_area: String,
    pub bio: Option<String>,
}

pub fn validate_new_provider(payload: &CreateProviderPayload) -> Result<(), AppError> {
    if payload.category.trim().is_empty() {
        return Err(AppError::ValidationError("category is required".to_string()));
    }
    if payload.service_area.trim().is_empty() {
        return Err(AppError::ValidationError("service area is required".to_string()));
    }
    if payload.hourly_rate <= Decimal::ZERO {
        return Err(AppError::ValidationError(
            "hourly rate must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Creates the calling user's provider profile. One profile per account;
/// the unique index on `user_id` turns a second attempt into a 409.
pub async fn create_provider(
    req: HttpRequest,
    payload: web::Json<CreateProviderPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Provider)?;
    validate_new_provider(&payload)?;

    let provider = Provider::new(
        user.id,
        payload.category.trim().to_string(),
        payload.hourly_rate,
        payload.service_area.trim().to_string(),
        payload.bio.as_ref().map(|b| b.trim().to_string()),
    );
    let provider = state.db.create_provider(&provider).await?;

    info!(provider_id = %provider.id, category = %provider.category, "Provider profile created");
    Ok(HttpResponse::Created().json(provider))
}

pub async fn get_provider(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let provider = state
        .db
        .get_provider(path.into_inner())
        .await?
        .ok_or(DatabaseError::NotFound)?;

    Ok(HttpResponse::Ok().json(provider))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub category: String,
}

/// Public browsing endpoint, best-rated first.
pub async fn search_providers(
    query: web::Query<SearchQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if query.category.trim().is_empty() {
        return Err(AppError::ValidationError("category is required".to_string()));
    }

    let providers = state
        .db
        .list_providers_by_category(query.category.trim())
        .await?;

    Ok(HttpResponse::Ok().json(providers))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPayload {
    pub is_verified: bool,
}

/// Admin verification toggle; unverified providers never enter the
/// matching cascade.
pub async fn verify_provider(
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<VerifyPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let provider_id = path.into_inner();
    if state.db.get_provider(provider_id).await?.is_none() {
        return Err(DatabaseError::NotFound.into());
    }

    let provider = state
        .db
        .set_provider_verified(provider_id, payload.is_verified)
        .await?;

    state
        .db
        .record_audit(
            user.id,
            "provider.verify",
            &format!(
                "set is_verified={} on provider {}",
                provider.is_verified, provider.id
            ),
        )
        .await?;

    info!(provider_id = %provider.id, is_verified = provider.is_verified, "Provider verification updated");
    Ok(HttpResponse::Ok().json(provider))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityPayload {
    pub is_available: bool,
}

/// Providers flip their own availability; unavailable profiles are skipped
/// by the cascade but keep their listing.
pub async fn set_availability(
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<AvailabilityPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let provider_id = path.into_inner();
    let provider = state
        .db
        .get_provider(provider_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if provider.user_id != user.id && user.role() != Some(Role::Admin) {
        return Err(AuthError::Forbidden.into());
    }

    let provider = state
        .db
        .set_provider_availability(provider_id, payload.is_available)
        .await?;

    Ok(HttpResponse::Ok().json(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_updated_rating_first_score_replaces_prior() {
        // The optimistic 5.0 prior vanishes on the first real score
        assert_eq!(updated_rating(5.0, 1, 3), 3.0);
    }

    #[test]
    fn test_updated_rating_running_average() {
        let after_two = updated_rating(4.0, 2, 5);
        assert!((after_two - 4.5).abs() < 1e-9);

        let after_three = updated_rating(after_two, 3, 3);
        assert!((after_three - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_new_provider() {
        let mut p = CreateProviderPayload {
            category: "plumbing".to_string(),
            hourly_rate: dec!(45.00),
            service_area: "Lyon".to_string(),
            bio: None,
        };
        assert!(validate_new_provider(&p).is_ok());

        p.hourly_rate = dec!(0.00);
        assert!(validate_new_provider(&p).is_err());

        p.hourly_rate = dec!(45.00);
        p.category = String::new();
        assert!(validate_new_provider(&p).is_err());
    }
}
