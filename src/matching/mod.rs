//! Provider matching for client requests.
//!
//! Candidate selection is a plain ranking over the provider rows: verified,
//! available, above the configured rating threshold, best rating first. The
//! assignment cascade walks that ranking one provider at a time, giving each
//! a response deadline that is compared against the clock whenever the
//! mission row is next read.

pub mod handlers;
mod service;

pub use service::{
    assign_request, reassign_emergency, respond_to_mission, AssignmentOutcome, MissionOutcome,
};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::db::models::Provider;

/// The provider's answer to a mission, as posted by the front-end with an
/// `action` discriminator field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MissionReply {
    Accept,
    Decline { reason: Option<String> },
}

/// What a reply resolves to once the deadline is taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseResolution {
    Accept,
    Decline,
    Expired,
}

/// Deadlines are advisory: nothing fires when one passes. The comparison
/// happens here, when the response finally arrives.
pub fn resolve_response(
    now: DateTime<Utc>,
    deadline: DateTime<Utc>,
    reply: &MissionReply,
) -> ResponseResolution {
    if now > deadline {
        return ResponseResolution::Expired;
    }
    match reply {
        MissionReply::Accept => ResponseResolution::Accept,
        MissionReply::Decline { .. } => ResponseResolution::Decline,
    }
}

pub fn is_eligible(provider: &Provider, min_rating: f64) -> bool {
    provider.is_verified && provider.is_available && provider.rating >= min_rating
}

/// Best candidates first: rating, then track record, then newest profile.
pub fn rank(mut providers: Vec<Provider>) -> Vec<Provider> {
    providers.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(Ordering::Equal)
            .then(b.completed_missions.cmp(&a.completed_missions))
            .then(b.created_at.cmp(&a.created_at))
    });
    providers
}

/// The next provider to try for a request: eligible, not already attempted.
pub fn select_candidate(
    providers: Vec<Provider>,
    exclude: &[Uuid],
    min_rating: f64,
) -> Option<Provider> {
    rank(providers)
        .into_iter()
        .filter(|p| is_eligible(p, min_rating))
        .find(|p| !exclude.contains(&p.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn provider(rating: f64, completed: i32, verified: bool, available: bool) -> Provider {
        let mut p = Provider::new(
            Uuid::new_v4(),
            "cleaning".to_string(),
            dec!(30.00),
            "Paris".to_string(),
            None,
        );
        p.rating = rating;
        p.completed_missions = completed;
        p.is_verified = verified;
        p.is_available = available;
        p
    }

    #[test]
    fn test_eligibility() {
        assert!(is_eligible(&provider(4.5, 10, true, true), 3.5));
        assert!(!is_eligible(&provider(3.0, 10, true, true), 3.5));
        assert!(!is_eligible(&provider(4.5, 10, false, true), 3.5));
        assert!(!is_eligible(&provider(4.5, 10, true, false), 3.5));
    }

    #[test]
    fn test_rank_orders_by_rating_then_track_record() {
        let low = provider(3.9, 50, true, true);
        let high = provider(4.8, 2, true, true);
        let seasoned = provider(4.8, 40, true, true);

        let ranked = rank(vec![low.clone(), high.clone(), seasoned.clone()]);
        assert_eq!(ranked[0].id, seasoned.id);
        assert_eq!(ranked[1].id, high.id);
        assert_eq!(ranked[2].id, low.id);
    }

    #[test]
    fn test_select_candidate_skips_attempted_and_ineligible() {
        let best = provider(4.9, 30, true, true);
        let backup = provider(4.2, 12, true, true);
        let unverified = provider(5.0, 90, false, true);

        let picked = select_candidate(
            vec![best.clone(), backup.clone(), unverified.clone()],
            &[best.id],
            3.5,
        )
        .expect("backup expected");
        assert_eq!(picked.id, backup.id);

        // Nobody left once the backup was tried too
        assert!(select_candidate(
            vec![best.clone(), backup.clone(), unverified],
            &[best.id, backup.id],
            3.5,
        )
        .is_none());
    }

    #[test]
    fn test_resolve_response_honors_deadline() {
        let now = Utc::now();
        let deadline = now + Duration::minutes(10);

        assert_eq!(
            resolve_response(now, deadline, &MissionReply::Accept),
            ResponseResolution::Accept
        );
        assert_eq!(
            resolve_response(now, deadline, &MissionReply::Decline { reason: None }),
            ResponseResolution::Decline
        );
        // A late accept expires the mission instead of applying the action
        assert_eq!(
            resolve_response(now + Duration::minutes(11), deadline, &MissionReply::Accept),
            ResponseResolution::Expired
        );
    }

    #[test]
    fn test_mission_reply_action_dispatch() {
        let accept: MissionReply = serde_json::from_str(r#"{"action": "accept"}"#).unwrap();
        assert!(matches!(accept, MissionReply::Accept));

        let decline: MissionReply =
            serde_json::from_str(r#"{"action": "decline", "reason": "double-booked"}"#).unwrap();
        match decline {
            MissionReply::Decline { reason } => assert_eq!(reason.as_deref(), Some("double-booked")),
            _ => panic!("expected decline"),
        }

        assert!(serde_json::from_str::<MissionReply>(r#"{"action": "snooze"}"#).is_err());
    }
}
