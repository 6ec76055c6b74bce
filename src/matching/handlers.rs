use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{authenticate_request, require_role};
use crate::db::models::Role;
use crate::error::{AppError, AuthError};
use crate::matching::{self, MissionOutcome, MissionReply};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub request_id: Uuid,
}

/// Admin-triggered assignment of an open request. The same service call
/// runs automatically when a request is submitted; this endpoint exists for
/// requests that came back to `open` after an exhausted cascade.
pub async fn assign_mission(
    req: HttpRequest,
    body: web::Json<AssignRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let outcome = matching::assign_request(&state.db, &state.config.matching, body.request_id)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("no eligible provider for this request".to_string())
        })?;

    state
        .db
        .record_audit(
            user.id,
            "mission.assign",
            &format!(
                "assigned request {} to provider {} (mission {})",
                body.request_id, outcome.provider.id, outcome.mission.id
            ),
        )
        .await?;

    if let Some(mailer) = &state.mailer {
        if let Ok(Some(provider_user)) = state.db.get_user_by_id(outcome.provider.user_id).await {
            if let Err(e) = mailer
                .mission_assigned(
                    &provider_user.email,
                    outcome.provider.category.as_str(),
                    outcome.mission.response_deadline,
                )
                .await
            {
                warn!("Failed to send mission assignment email: {}", e);
            }
        }
    }

    Ok(HttpResponse::Ok().json(outcome))
}

/// The provider's accept/decline, dispatched on the JSON `action` field.
pub async fn respond_mission(
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<MissionReply>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    let provider = state
        .db
        .get_provider_by_user(user.id)
        .await?
        .ok_or(AuthError::Forbidden)?;

    let mission_id = path.into_inner();
    let outcome = matching::respond_to_mission(
        &state.db,
        &state.config.matching,
        mission_id,
        provider.id,
        &body,
    )
    .await?;

    if let MissionOutcome::Accepted { booking, .. } = &outcome {
        if let Some(mailer) = &state.mailer {
            if let Ok(Some(client)) = state.db.get_user_by_id(booking.client_id).await {
                if let Err(e) = mailer
                    .booking_confirmed(&client.email, &booking.category, booking.scheduled_for, booking.price)
                    .await
                {
                    warn!("Failed to send booking confirmation email: {}", e);
                }
            }
        }
    }

    Ok(HttpResponse::Ok().json(outcome))
}

/// Admin emergency reassignment of a mission whose provider bailed.
pub async fn reassign_mission(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let mission_id = path.into_inner();
    let outcome =
        matching::reassign_emergency(&state.db, &state.config.matching, mission_id).await?;

    state
        .db
        .record_audit(
            user.id,
            "mission.reassign",
            &format!(
                "emergency reassignment of mission {} to provider {} (mission {})",
                mission_id, outcome.provider.id, outcome.mission.id
            ),
        )
        .await?;

    info!(mission_id = %mission_id, "Emergency reassignment requested");
    Ok(HttpResponse::Ok().json(outcome))
}

/// Missions for the calling provider, newest first.
pub async fn list_missions(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    let provider = state
        .db
        .get_provider_by_user(user.id)
        .await?
        .ok_or(AuthError::Forbidden)?;

    let missions = state.db.list_missions_for_provider(provider.id).await?;
    Ok(HttpResponse::Ok().json(missions))
}
