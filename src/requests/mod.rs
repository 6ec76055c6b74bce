//! Client request intake and lifecycle handlers.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::authenticate_request;
use crate::db::models::{ClientRequest, RequestStatus, Role};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::matching;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRequestPayload {
    pub category: String,
    pub description: String,
    pub location: String,
    pub budget: Decimal,
    pub preferred_date: Option<DateTime<Utc>>,
}

pub fn validate_new_request(payload: &CreateRequestPayload) -> Result<(), AppError> {
    if payload.category.trim().is_empty() {
        return Err(AppError::ValidationError("category is required".to_string()));
    }
    if payload.location.trim().is_empty() {
        return Err(AppError::ValidationError("location is required".to_string()));
    }
    if payload.budget <= Decimal::ZERO {
        return Err(AppError::ValidationError("budget must be positive".to_string()));
    }
    if let Some(date) = payload.preferred_date {
        if date < Utc::now() {
            return Err(AppError::ValidationError(
                "preferred date must be in the future".to_string(),
            ));
        }
    }
    Ok(())
}

/// Creates a client request and immediately runs the matching cascade over
/// it. A request with no eligible provider simply stays `open`; a matching
/// failure is logged but never loses the submitted request.
pub async fn create_request(
    req: HttpRequest,
    payload: web::Json<CreateRequestPayload>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    validate_new_request(&payload)?;

    let request = ClientRequest::new(
        user.id,
        payload.category.trim().to_string(),
        payload.description.trim().to_string(),
        payload.location.trim().to_string(),
        payload.budget,
        payload.preferred_date,
    );
    let request = state.db.create_request(&request).await?;
    info!(request_id = %request.id, category = %request.category, "Client request created");

    let assignment = match matching::assign_request(&state.db, &state.config.matching, request.id)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(request_id = %request.id, "Automatic assignment failed: {}", e);
            None
        }
    };

    if let Some(outcome) = &assignment {
        if let Some(mailer) = &state.mailer {
            if let Ok(Some(provider_user)) = state.db.get_user_by_id(outcome.provider.user_id).await
            {
                if let Err(e) = mailer
                    .mission_assigned(
                        &provider_user.email,
                        &outcome.provider.category,
                        outcome.mission.response_deadline,
                    )
                    .await
                {
                    warn!("Failed to send mission assignment email: {}", e);
                }
            }
        }
    }

    Ok(HttpResponse::Created().json(serde_json::json!({
        "request": request,
        "assignment": assignment,
    })))
}

/// The caller's requests, newest first.
pub async fn list_requests(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    let requests = state.db.list_requests_for_client(user.id).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Owner (or admin) cancels a request that has not been fulfilled yet. Any
/// pending mission attached to it is expired so the provider's answer can
/// no longer land.
pub async fn cancel_request(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let request_id = path.into_inner();
    let request = state
        .db
        .get_request(request_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if request.client_id != user.id && user.role() != Some(Role::Admin) {
        return Err(AuthError::Forbidden.into());
    }

    let status = RequestStatus::parse(&request.status)
        .ok_or_else(|| AppError::InternalError(format!("unknown request status: {}", request.status)))?;
    if status != RequestStatus::Open && status != RequestStatus::Matched {
        return Err(AppError::Conflict(
            "request can no longer be cancelled".to_string(),
        ));
    }

    let expired = state.db.expire_pending_missions_for_request(request.id).await?;
    let request = state
        .db
        .update_request_status(request.id, RequestStatus::Cancelled.as_str())
        .await?;

    info!(
        request_id = %request.id,
        expired_missions = expired,
        "Client request cancelled"
    );
    Ok(HttpResponse::Ok().json(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn payload() -> CreateRequestPayload {
        CreateRequestPayload {
            category: "cleaning".to_string(),
            description: "Two-bedroom apartment, deep clean".to_string(),
            location: "12 rue des Lilas, Lyon".to_string(),
            budget: dec!(90.00),
            preferred_date: Some(Utc::now() + Duration::days(3)),
        }
    }

    #[test]
    fn test_validate_accepts_complete_payload() {
        assert!(validate_new_request(&payload()).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut p = payload();
        p.category = "  ".to_string();
        assert!(validate_new_request(&p).is_err());

        let mut p = payload();
        p.location = String::new();
        assert!(validate_new_request(&p).is_err());
    }

    #[test]
    fn test_validate_rejects_nonpositive_budget() {
        let mut p = payload();
        p.budget = dec!(0.00);
        assert!(validate_new_request(&p).is_err());
        p.budget = dec!(-5.00);
        assert!(validate_new_request(&p).is_err());
    }

    #[test]
    fn test_validate_rejects_past_date() {
        let mut p = payload();
        p.preferred_date = Some(Utc::now() - Duration::days(1));
        assert!(validate_new_request(&p).is_err());
    }
}
