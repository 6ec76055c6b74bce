use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account roles. Stored as text on `users.role`; handlers check roles ad
/// hoc before admin- or provider-only mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Role::Client),
            "provider" => Some(Role::Provider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Lifecycle of a client request: open -> matched -> fulfilled | cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    Matched,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Matched => "matched",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(RequestStatus::Open),
            "matched" => Some(RequestStatus::Matched),
            "fulfilled" => Some(RequestStatus::Fulfilled),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

/// Lifecycle of a booking. Transitions are checked in handler code before
/// the row is written; the table itself only enforces the text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a booking may move from `self` to `next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
        )
    }
}

/// Lifecycle of a mission: pending -> accepted | declined | expired, plus
/// `reassigned` when an emergency reassignment replaces the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Reassigned,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Pending => "pending",
            MissionStatus::Accepted => "accepted",
            MissionStatus::Declined => "declined",
            MissionStatus::Expired => "expired",
            MissionStatus::Reassigned => "reassigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MissionStatus::Pending),
            "accepted" => Some(MissionStatus::Accepted),
            "declined" => Some(MissionStatus::Declined),
            "expired" => Some(MissionStatus::Expired),
            "reassigned" => Some(MissionStatus::Reassigned),
            _ => None,
        }
    }
}

/// Lifecycle of a financial transaction: pending -> paid | refunded | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "paid" => Some(TransactionStatus::Paid),
            "refunded" => Some(TransactionStatus::Refunded),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub display_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub rate_limit_tier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        email: String,
        password_hash: String,
        password_salt: String,
        display_name: Option<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            password_salt,
            display_name,
            role: role.as_str().to_string(),
            is_active: true,
            rate_limit_tier: "standard".to_string(),
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user_id: Uuid, token: String, expires_in_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + Duration::hours(expires_in_hours),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub hourly_rate: Decimal,
    pub service_area: String,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub is_available: bool,
    pub rating: f64,
    pub completed_missions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(
        user_id: Uuid,
        category: String,
        hourly_rate: Decimal,
        service_area: String,
        bio: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            category,
            hourly_rate,
            service_area,
            bio,
            is_verified: false,
            is_available: true,
            // Fresh profiles start at the ceiling so the rating threshold
            // cannot exclude providers who were never booked; client scores
            // pull it down from here.
            rating: 5.0,
            completed_missions: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub category: String,
    pub description: String,
    pub location: String,
    pub budget: Decimal,
    pub preferred_date: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRequest {
    pub fn new(
        client_id: Uuid,
        category: String,
        description: String,
        location: String,
        budget: Decimal,
        preferred_date: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            category,
            description,
            location,
            budget,
            preferred_date,
            status: RequestStatus::Open.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub request_id: Option<Uuid>,
    pub category: String,
    pub scheduled_for: DateTime<Utc>,
    pub address: String,
    pub price: Decimal,
    pub status: String,
    pub client_rating: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        client_id: Uuid,
        provider_id: Uuid,
        request_id: Option<Uuid>,
        category: String,
        scheduled_for: DateTime<Utc>,
        address: String,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            provider_id,
            request_id,
            category,
            scheduled_for,
            address,
            price,
            status: BookingStatus::Pending.as_str().to_string(),
            client_rating: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mission {
    pub id: Uuid,
    pub request_id: Uuid,
    pub provider_id: Uuid,
    pub status: String,
    /// Advisory deadline for the provider's response, compared against the
    /// clock by whichever handler reads the row next.
    pub response_deadline: DateTime<Utc>,
    /// Position in the assignment cascade, starting at 1.
    pub attempt: i32,
    pub is_emergency: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mission {
    pub fn new(
        request_id: Uuid,
        provider_id: Uuid,
        response_window_minutes: i64,
        attempt: i32,
        is_emergency: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id,
            provider_id,
            status: MissionStatus::Pending.as_str().to_string(),
            response_deadline: now + Duration::minutes(response_window_minutes),
            attempt,
            is_emergency,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.response_deadline
    }
}

/// Fixed provider payment per service category, admin-editable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinancialRule {
    pub id: Uuid,
    pub category: String,
    pub provider_payment: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinancialTransaction {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub amount: Decimal,
    pub provider_payout: Decimal,
    pub platform_fee: Decimal,
    pub gateway_ref: Option<String>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinancialTransaction {
    pub fn new(
        booking_id: Uuid,
        client_id: Uuid,
        provider_id: Uuid,
        amount: Decimal,
        provider_payout: Decimal,
        platform_fee: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            client_id,
            provider_id,
            amount,
            provider_payout,
            platform_fee,
            gateway_ref: None,
            status: TransactionStatus::Pending.as_str().to_string(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Free-text bookkeeping rows written by admin-facing mutations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Client, Role::Provider, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_booking_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
    }

    #[test]
    fn test_mission_deadline() {
        let mission = Mission::new(Uuid::new_v4(), Uuid::new_v4(), 30, 1, false);
        let now = Utc::now();
        assert!(!mission.deadline_passed(now));
        assert!(mission.deadline_passed(now + Duration::minutes(31)));
        assert_eq!(mission.status, "pending");
        assert_eq!(mission.attempt, 1);
    }

    #[test]
    fn test_new_provider_defaults() {
        let provider = Provider::new(
            Uuid::new_v4(),
            "plumbing".to_string(),
            dec!(45.00),
            "Lyon".to_string(),
            None,
        );
        assert!(!provider.is_verified);
        assert!(provider.is_available);
        assert_eq!(provider.rating, 5.0);
        assert_eq!(provider.completed_missions, 0);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!(MissionStatus::parse("pending"), Some(MissionStatus::Pending));
        assert_eq!(MissionStatus::parse("on_hold"), None);
        assert_eq!(TransactionStatus::parse("paid"), Some(TransactionStatus::Paid));
        assert_eq!(TransactionStatus::parse("charged_back"), None);
        assert_eq!(RequestStatus::parse("matched"), Some(RequestStatus::Matched));
        assert_eq!(RequestStatus::parse(""), None);
    }
}
