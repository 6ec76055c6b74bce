use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::db::models::{
    Booking, ClientRequest, Mission, MissionStatus, Provider, RequestStatus,
};
use crate::db::MarketplaceDb;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::matching::{resolve_response, select_candidate, MissionReply, ResponseResolution};

#[derive(Debug, Serialize)]
pub struct AssignmentOutcome {
    pub mission: Mission,
    pub provider: Provider,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MissionOutcome {
    Accepted {
        mission: Mission,
        booking: Booking,
    },
    Declined {
        next: Option<AssignmentOutcome>,
    },
    Expired {
        next: Option<AssignmentOutcome>,
    },
}

fn parse_request_status(request: &ClientRequest) -> Result<RequestStatus, AppError> {
    RequestStatus::parse(&request.status)
        .ok_or_else(|| AppError::InternalError(format!("unknown request status: {}", request.status)))
}

fn parse_mission_status(mission: &Mission) -> Result<MissionStatus, AppError> {
    MissionStatus::parse(&mission.status)
        .ok_or_else(|| AppError::InternalError(format!("unknown mission status: {}", mission.status)))
}

/// Picks the next untried candidate for a request and writes the pending
/// mission row. Returns `None` when the cascade is exhausted, either because
/// no eligible provider remains or the attempt cap was hit.
async fn next_assignment(
    db: &MarketplaceDb,
    config: &MatchingConfig,
    request: &ClientRequest,
    is_emergency: bool,
) -> Result<Option<AssignmentOutcome>, AppError> {
    let attempted = db.attempted_provider_ids(request.id).await?;
    if attempted.len() as i32 >= config.max_attempts {
        warn!(
            request_id = %request.id,
            attempts = attempted.len(),
            "Assignment cascade hit the attempt cap"
        );
        return Ok(None);
    }

    let candidates = db.list_providers_by_category(&request.category).await?;
    let Some(provider) = select_candidate(candidates, &attempted, config.min_rating) else {
        return Ok(None);
    };

    let mission = Mission::new(
        request.id,
        provider.id,
        config.response_window_minutes,
        attempted.len() as i32 + 1,
        is_emergency,
    );
    let mission = db.create_mission(&mission).await?;

    info!(
        mission_id = %mission.id,
        request_id = %request.id,
        provider_id = %provider.id,
        attempt = mission.attempt,
        "Mission assigned"
    );

    Ok(Some(AssignmentOutcome { mission, provider }))
}

/// Assigns an open request to its best-ranked eligible provider. `None`
/// means no candidate was found and the request stays open.
pub async fn assign_request(
    db: &MarketplaceDb,
    config: &MatchingConfig,
    request_id: Uuid,
) -> Result<Option<AssignmentOutcome>, AppError> {
    let request = db
        .get_request(request_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if parse_request_status(&request)? != RequestStatus::Open {
        return Err(AppError::Conflict(
            "request is not open for assignment".to_string(),
        ));
    }

    let outcome = next_assignment(db, config, &request, false).await?;
    if outcome.is_some() {
        db.update_request_status(request.id, RequestStatus::Matched.as_str())
            .await?;
    }

    Ok(outcome)
}

/// After a decline or expiry, either hands the request to the next backup
/// provider or sends it back to `open` for manual handling.
async fn cascade(
    db: &MarketplaceDb,
    config: &MatchingConfig,
    request: &ClientRequest,
) -> Result<Option<AssignmentOutcome>, AppError> {
    let next = next_assignment(db, config, request, false).await?;
    if next.is_none() {
        db.update_request_status(request.id, RequestStatus::Open.as_str())
            .await?;
        info!(request_id = %request.id, "Cascade exhausted, request reopened");
    }
    Ok(next)
}

/// Applies a provider's accept/decline. The deadline is compared here, at
/// read time: a late reply expires the mission and the cascade moves on.
/// Status writes are guarded on `pending`, so of two simultaneous responses
/// one observes a conflict.
pub async fn respond_to_mission(
    db: &MarketplaceDb,
    config: &MatchingConfig,
    mission_id: Uuid,
    responder_provider_id: Uuid,
    reply: &MissionReply,
) -> Result<MissionOutcome, AppError> {
    let mission = db
        .get_mission(mission_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if mission.provider_id != responder_provider_id {
        return Err(AuthError::Forbidden.into());
    }

    if parse_mission_status(&mission)? != MissionStatus::Pending {
        return Err(AppError::Conflict("mission already resolved".to_string()));
    }

    let request = db
        .get_request(mission.request_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    match resolve_response(Utc::now(), mission.response_deadline, reply) {
        ResponseResolution::Expired => {
            let updated = db
                .transition_mission(mission.id, MissionStatus::Pending, MissionStatus::Expired)
                .await?;
            if updated.is_none() {
                return Err(AppError::Conflict("mission already resolved".to_string()));
            }
            info!(mission_id = %mission.id, "Response arrived past the deadline, mission expired");
            let next = cascade(db, config, &request).await?;
            Ok(MissionOutcome::Expired { next })
        }
        ResponseResolution::Decline => {
            let updated = db
                .transition_mission(mission.id, MissionStatus::Pending, MissionStatus::Declined)
                .await?;
            if updated.is_none() {
                return Err(AppError::Conflict("mission already resolved".to_string()));
            }
            info!(mission_id = %mission.id, "Mission declined");
            let next = cascade(db, config, &request).await?;
            Ok(MissionOutcome::Declined { next })
        }
        ResponseResolution::Accept => {
            let mut transaction = db.begin_transaction().await?;

            let result = async {
                let updated = db
                    .transition_mission_tx(
                        &mut transaction,
                        mission.id,
                        MissionStatus::Pending,
                        MissionStatus::Accepted,
                    )
                    .await?;
                let mission = updated
                    .ok_or_else(|| AppError::Conflict("mission already resolved".to_string()))?;

                let scheduled_for = request
                    .preferred_date
                    .unwrap_or_else(|| Utc::now() + Duration::days(1));
                let booking = Booking::new(
                    request.client_id,
                    mission.provider_id,
                    Some(request.id),
                    request.category.clone(),
                    scheduled_for,
                    request.location.clone(),
                    request.budget,
                );
                let booking = db.create_booking_tx(&booking, &mut transaction).await?;

                db.update_request_status_tx(
                    &mut transaction,
                    request.id,
                    RequestStatus::Fulfilled.as_str(),
                )
                .await?;

                Ok::<_, AppError>((mission, booking))
            }
            .await;

            match result {
                Ok((mission, booking)) => {
                    transaction.commit().await?;
                    info!(
                        mission_id = %mission.id,
                        booking_id = %booking.id,
                        "Mission accepted, booking created"
                    );
                    Ok(MissionOutcome::Accepted { mission, booking })
                }
                Err(e) => {
                    transaction.rollback().await?;
                    Err(e)
                }
            }
        }
    }
}

/// Emergency reassignment: pulls a pending or accepted mission away from
/// its provider and hands the request to the best remaining candidate. The
/// replacement mission is flagged so the front-end can surface it.
pub async fn reassign_emergency(
    db: &MarketplaceDb,
    config: &MatchingConfig,
    mission_id: Uuid,
) -> Result<AssignmentOutcome, AppError> {
    let mission = db
        .get_mission(mission_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    let status = parse_mission_status(&mission)?;
    if status != MissionStatus::Pending && status != MissionStatus::Accepted {
        return Err(AppError::Conflict(
            "only pending or accepted missions can be reassigned".to_string(),
        ));
    }

    let request = db
        .get_request(mission.request_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    let updated = db
        .transition_mission(mission.id, status, MissionStatus::Reassigned)
        .await?;
    if updated.is_none() {
        return Err(AppError::Conflict("mission already resolved".to_string()));
    }

    let attempted = db.attempted_provider_ids(request.id).await?;
    let candidates = db.list_providers_by_category(&request.category).await?;
    let Some(provider) = select_candidate(candidates, &attempted, config.min_rating) else {
        db.update_request_status(request.id, RequestStatus::Open.as_str())
            .await?;
        warn!(
            mission_id = %mission.id,
            request_id = %request.id,
            "Emergency reassignment found no backup, request reopened"
        );
        return Err(AppError::Conflict(
            "no eligible backup provider available".to_string(),
        ));
    };

    let replacement = Mission::new(
        request.id,
        provider.id,
        config.response_window_minutes,
        attempted.len() as i32 + 1,
        true,
    );
    let replacement = db.create_mission(&replacement).await?;
    db.update_request_status(request.id, RequestStatus::Matched.as_str())
        .await?;

    info!(
        old_mission_id = %mission.id,
        mission_id = %replacement.id,
        provider_id = %provider.id,
        "Emergency reassignment completed"
    );

    Ok(AssignmentOutcome {
        mission: replacement,
        provider,
    })
}
