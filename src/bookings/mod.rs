//! Booking handlers: direct bookings, status transitions, client ratings.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::authenticate_request;
use crate::db::models::{Booking, BookingStatus, Role, User};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::providers::updated_rating;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingPayload {
    pub provider_id: Uuid,
    pub category: String,
    pub scheduled_for: DateTime<Utc>,
    pub address: String,
    pub price: Decimal,
}

pub fn validate_new_booking(payload: &CreateBookingPayload, now: DateTime<Utc>) -> Result<(), AppError> {
    if payload.category.trim().is_empty() {
        return Err(AppError::ValidationError("category is required".to_string()));
    }
    if payload.address.trim().is_empty() {
        return Err(AppError::ValidationError("address is required".to_string()));
    }
    if payload.price <= Decimal::ZERO {
        return Err(AppError::ValidationError("price must be positive".to_string()));
    }
    if payload.scheduled_for <= now {
        return Err(AppError::ValidationError(
            "scheduled date must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Direct booking of a chosen provider, bypassing the matching cascade.
pub async fn create_booking(
    req: HttpRequest,
    payload: web::Json<CreateBookingPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    validate_new_booking(&payload, Utc::now())?;

    let provider = state
        .db
        .get_provider(payload.provider_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if !provider.is_verified {
        return Err(AppError::ValidationError(
            "provider is not verified".to_string(),
        ));
    }

    let booking = Booking::new(
        user.id,
        provider.id,
        None,
        payload.category.trim().to_string(),
        payload.scheduled_for,
        payload.address.trim().to_string(),
        payload.price,
    );
    let booking = state.db.create_booking(&booking).await?;

    info!(booking_id = %booking.id, provider_id = %provider.id, "Booking created");
    Ok(HttpResponse::Created().json(booking))
}

pub async fn get_booking(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let booking = state
        .db
        .get_booking(path.into_inner())
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if !is_participant(&user, &booking, &state).await? {
        return Err(AuthError::Forbidden.into());
    }

    Ok(HttpResponse::Ok().json(booking))
}

/// The caller's bookings: clients see what they booked, providers their
/// schedule, admins a recent slice of everything.
pub async fn list_bookings(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let bookings = match user.role() {
        Some(Role::Admin) => state.db.list_bookings(100).await?,
        Some(Role::Provider) => {
            let provider = state
                .db
                .get_provider_by_user(user.id)
                .await?
                .ok_or(AuthError::Forbidden)?;
            state.db.list_bookings_for_provider(provider.id).await?
        }
        _ => state.db.list_bookings_for_client(user.id).await?,
    };

    Ok(HttpResponse::Ok().json(bookings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: BookingStatus,
}

/// Guarded status transition. Providers move work forward, clients can
/// only cancel, admins can do either. Completion bumps the provider's
/// track record.
pub async fn update_booking_status(
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateStatusPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let booking_id = path.into_inner();
    let booking = state
        .db
        .get_booking(booking_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    let current = BookingStatus::parse(&booking.status)
        .ok_or_else(|| AppError::InternalError(format!("unknown booking status: {}", booking.status)))?;
    let next = payload.status;

    if !current.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "cannot move booking from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    authorize_transition(&user, &booking, next, &state).await?;

    let booking = state
        .db
        .update_booking_status(booking.id, next.as_str())
        .await?;

    if next == BookingStatus::Completed {
        state
            .db
            .increment_completed_missions(booking.provider_id)
            .await?;
    }

    if next == BookingStatus::Confirmed {
        if let Some(mailer) = &state.mailer {
            if let Ok(Some(client)) = state.db.get_user_by_id(booking.client_id).await {
                if let Err(e) = mailer
                    .booking_confirmed(
                        &client.email,
                        &booking.category,
                        booking.scheduled_for,
                        booking.price,
                    )
                    .await
                {
                    warn!("Failed to send booking confirmation email: {}", e);
                }
            }
        }
    }

    info!(booking_id = %booking.id, status = %booking.status, "Booking status updated");
    Ok(HttpResponse::Ok().json(booking))
}

#[derive(Debug, Deserialize)]
pub struct RateBookingPayload {
    pub score: u8,
}

/// Client scores a completed booking once; the provider's rating becomes
/// the running average of all scores.
pub async fn rate_booking(
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<RateBookingPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    if !(1..=5).contains(&payload.score) {
        return Err(AppError::ValidationError(
            "score must be between 1 and 5".to_string(),
        ));
    }

    let booking_id = path.into_inner();
    let booking = state
        .db
        .get_booking(booking_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if booking.client_id != user.id {
        return Err(AuthError::Forbidden.into());
    }

    if BookingStatus::parse(&booking.status) != Some(BookingStatus::Completed) {
        return Err(AppError::Conflict(
            "only completed bookings can be rated".to_string(),
        ));
    }

    let booking = state
        .db
        .set_booking_rating(booking.id, i16::from(payload.score))
        .await?
        .ok_or_else(|| AppError::Conflict("booking already rated".to_string()))?;

    let provider = state
        .db
        .get_provider(booking.provider_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    let rating = updated_rating(provider.rating, provider.completed_missions, payload.score);
    let provider = state.db.update_provider_rating(provider.id, rating).await?;

    info!(
        booking_id = %booking.id,
        provider_id = %provider.id,
        rating = provider.rating,
        "Booking rated"
    );
    Ok(HttpResponse::Ok().json(booking))
}

async fn is_participant(
    user: &User,
    booking: &Booking,
    state: &AppState,
) -> Result<bool, AppError> {
    if user.role() == Some(Role::Admin) || booking.client_id == user.id {
        return Ok(true);
    }
    if let Some(provider) = state.db.get_provider_by_user(user.id).await? {
        return Ok(provider.id == booking.provider_id);
    }
    Ok(false)
}

async fn authorize_transition(
    user: &User,
    booking: &Booking,
    next: BookingStatus,
    state: &AppState,
) -> Result<(), AppError> {
    if user.role() == Some(Role::Admin) {
        return Ok(());
    }

    if booking.client_id == user.id {
        // Clients only back out; the provider drives the work forward
        if next == BookingStatus::Cancelled {
            return Ok(());
        }
        return Err(AuthError::Forbidden.into());
    }

    if let Some(provider) = state.db.get_provider_by_user(user.id).await? {
        if provider.id == booking.provider_id
            && matches!(
                next,
                BookingStatus::Confirmed | BookingStatus::InProgress | BookingStatus::Completed
            )
        {
            return Ok(());
        }
    }

    Err(AuthError::Forbidden.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn payload() -> CreateBookingPayload {
        CreateBookingPayload {
            provider_id: Uuid::new_v4(),
            category: "gardening".to_string(),
            scheduled_for: Utc::now() + Duration::days(2),
            address: "8 avenue du Parc, Nantes".to_string(),
            price: dec!(150.00),
        }
    }

    #[test]
    fn test_validate_new_booking() {
        let now = Utc::now();
        assert!(validate_new_booking(&payload(), now).is_ok());

        let mut p = payload();
        p.price = dec!(-1.00);
        assert!(validate_new_booking(&p, now).is_err());

        let mut p = payload();
        p.scheduled_for = now - Duration::hours(1);
        assert!(validate_new_booking(&p, now).is_err());

        let mut p = payload();
        p.address = " ".to_string();
        assert!(validate_new_booking(&p, now).is_err());
    }
}
