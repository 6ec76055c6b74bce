use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{
    AuditLogEntry, Booking, ClientRequest, FinancialRule, FinancialTransaction, Mission,
    MissionStatus, Provider, User, UserSession,
};
use crate::error::AppError;

/// Data access layer for the marketplace tables. Cheap to clone; all clones
/// share one connection pool.
#[derive(Clone)]
pub struct MarketplaceDb {
    pool: Arc<PgPool>,
}

impl MarketplaceDb {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| {
                AppError::DatabaseError(crate::error::DatabaseError::ConnectionError(e.to_string()))
            })?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>, AppError> {
        Ok(self.pool.as_ref().begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ----- users and sessions -----

    pub async fn create_user(&self, user: &User) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, password_salt, display_name, role,
                               is_active, rate_limit_tier, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(&user.display_name)
        .bind(&user.role)
        .bind(user.is_active)
        .bind(&user.rate_limit_tier)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    pub async fn record_login(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = $1, updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    pub async fn create_session(&self, session: &UserSession) -> Result<UserSession, AppError> {
        let session = sqlx::query_as::<_, UserSession>(
            r#"
            INSERT INTO user_sessions (id, user_id, token, expires_at, created_at, last_activity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.last_activity)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(session)
    }

    pub async fn get_session_by_token(&self, token: &str) -> Result<Option<UserSession>, AppError> {
        let session =
            sqlx::query_as::<_, UserSession>("SELECT * FROM user_sessions WHERE token = $1")
                .bind(token)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(session)
    }

    pub async fn update_session_activity(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE user_sessions SET last_activity = $1 WHERE token = $2")
            .bind(Utc::now())
            .bind(token)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    // ----- providers -----

    pub async fn create_provider(&self, provider: &Provider) -> Result<Provider, AppError> {
        let provider = sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (id, user_id, category, hourly_rate, service_area, bio,
                                   is_verified, is_available, rating, completed_missions,
                                   created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(provider.id)
        .bind(provider.user_id)
        .bind(&provider.category)
        .bind(provider.hourly_rate)
        .bind(&provider.service_area)
        .bind(&provider.bio)
        .bind(provider.is_verified)
        .bind(provider.is_available)
        .bind(provider.rating)
        .bind(provider.completed_missions)
        .bind(provider.created_at)
        .bind(provider.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(provider)
    }

    pub async fn get_provider(&self, id: Uuid) -> Result<Option<Provider>, AppError> {
        let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(provider)
    }

    pub async fn get_provider_by_user(&self, user_id: Uuid) -> Result<Option<Provider>, AppError> {
        let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(provider)
    }

    /// Providers for one category, best candidates first. The ordering here
    /// is the cascade's tie-break: rating, then track record, then age.
    pub async fn list_providers_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Provider>, AppError> {
        let providers = sqlx::query_as::<_, Provider>(
            r#"
            SELECT * FROM providers
            WHERE category = $1
            ORDER BY rating DESC, completed_missions DESC, created_at DESC
            "#,
        )
        .bind(category)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(providers)
    }

    pub async fn set_provider_verified(
        &self,
        id: Uuid,
        is_verified: bool,
    ) -> Result<Provider, AppError> {
        let provider = sqlx::query_as::<_, Provider>(
            "UPDATE providers SET is_verified = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_verified)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(provider)
    }

    pub async fn set_provider_availability(
        &self,
        id: Uuid,
        is_available: bool,
    ) -> Result<Provider, AppError> {
        let provider = sqlx::query_as::<_, Provider>(
            "UPDATE providers SET is_available = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_available)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(provider)
    }

    pub async fn increment_completed_missions(&self, id: Uuid) -> Result<Provider, AppError> {
        let provider = sqlx::query_as::<_, Provider>(
            r#"
            UPDATE providers
            SET completed_missions = completed_missions + 1, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(provider)
    }

    pub async fn update_provider_rating(&self, id: Uuid, rating: f64) -> Result<Provider, AppError> {
        let provider = sqlx::query_as::<_, Provider>(
            "UPDATE providers SET rating = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(rating)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(provider)
    }

    // ----- client requests -----

    pub async fn create_request(&self, request: &ClientRequest) -> Result<ClientRequest, AppError> {
        let request = sqlx::query_as::<_, ClientRequest>(
            r#"
            INSERT INTO client_requests (id, client_id, category, description, location, budget,
                                         preferred_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.client_id)
        .bind(&request.category)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.budget)
        .bind(request.preferred_date)
        .bind(&request.status)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(request)
    }

    pub async fn get_request(&self, id: Uuid) -> Result<Option<ClientRequest>, AppError> {
        let request =
            sqlx::query_as::<_, ClientRequest>("SELECT * FROM client_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(request)
    }

    pub async fn list_requests_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ClientRequest>, AppError> {
        let requests = sqlx::query_as::<_, ClientRequest>(
            "SELECT * FROM client_requests WHERE client_id = $1 ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(requests)
    }

    pub async fn update_request_status(
        &self,
        id: Uuid,
        status: &str,
    ) -> Result<ClientRequest, AppError> {
        let request = sqlx::query_as::<_, ClientRequest>(
            "UPDATE client_requests SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(request)
    }

    pub async fn update_request_status_tx(
        &self,
        transaction: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: &str,
    ) -> Result<ClientRequest, AppError> {
        let request = sqlx::query_as::<_, ClientRequest>(
            "UPDATE client_requests SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&mut **transaction)
        .await?;

        Ok(request)
    }

    // ----- missions -----

    pub async fn create_mission(&self, mission: &Mission) -> Result<Mission, AppError> {
        let mission = sqlx::query_as::<_, Mission>(
            r#"
            INSERT INTO missions (id, request_id, provider_id, status, response_deadline,
                                  attempt, is_emergency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(mission.id)
        .bind(mission.request_id)
        .bind(mission.provider_id)
        .bind(&mission.status)
        .bind(mission.response_deadline)
        .bind(mission.attempt)
        .bind(mission.is_emergency)
        .bind(mission.created_at)
        .bind(mission.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(mission)
    }

    pub async fn get_mission(&self, id: Uuid) -> Result<Option<Mission>, AppError> {
        let mission = sqlx::query_as::<_, Mission>("SELECT * FROM missions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(mission)
    }

    /// Guarded status write: only succeeds while the row still carries
    /// `from`. Returns `None` when another response got there first, which
    /// is the entire conflict story for simultaneous responders.
    pub async fn transition_mission(
        &self,
        id: Uuid,
        from: MissionStatus,
        to: MissionStatus,
    ) -> Result<Option<Mission>, AppError> {
        let mission = sqlx::query_as::<_, Mission>(
            r#"
            UPDATE missions SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(mission)
    }

    pub async fn transition_mission_tx(
        &self,
        transaction: &mut Transaction<'_, Postgres>,
        id: Uuid,
        from: MissionStatus,
        to: MissionStatus,
    ) -> Result<Option<Mission>, AppError> {
        let mission = sqlx::query_as::<_, Mission>(
            r#"
            UPDATE missions SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .fetch_optional(&mut **transaction)
        .await?;

        Ok(mission)
    }

    /// Providers already tried for a request, in any mission status. Used to
    /// keep the cascade from revisiting a provider.
    pub async fn attempted_provider_ids(&self, request_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT provider_id FROM missions WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(ids)
    }

    pub async fn list_missions_for_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<Mission>, AppError> {
        let missions = sqlx::query_as::<_, Mission>(
            "SELECT * FROM missions WHERE provider_id = $1 ORDER BY created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(missions)
    }

    pub async fn expire_pending_missions_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE missions SET status = 'expired', updated_at = $2 WHERE request_id = $1 AND status = 'pending'",
        )
        .bind(request_id)
        .bind(Utc::now())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    // ----- bookings -----

    pub async fn create_booking(&self, booking: &Booking) -> Result<Booking, AppError> {
        let mut transaction = self.begin_transaction().await?;

        let result = self.create_booking_tx(booking, &mut transaction).await;

        match result {
            Ok(booking) => {
                transaction.commit().await?;
                Ok(booking)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }

    pub async fn create_booking_tx(
        &self,
        booking: &Booking,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, client_id, provider_id, request_id, category, scheduled_for,
                                  address, price, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.client_id)
        .bind(booking.provider_id)
        .bind(booking.request_id)
        .bind(&booking.category)
        .bind(booking.scheduled_for)
        .bind(&booking.address)
        .bind(booking.price)
        .bind(&booking.status)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&mut **transaction)
        .await?;

        Ok(booking)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(booking)
    }

    pub async fn list_bookings_for_client(&self, client_id: Uuid) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE client_id = $1 ORDER BY scheduled_for DESC",
        )
        .bind(client_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(bookings)
    }

    pub async fn list_bookings_for_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE provider_id = $1 ORDER BY scheduled_for DESC",
        )
        .bind(provider_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(bookings)
    }

    pub async fn list_bookings(&self, limit: i64) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(bookings)
    }

    pub async fn update_booking_status(&self, id: Uuid, status: &str) -> Result<Booking, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(booking)
    }

    /// Records the client's score once. Returns `None` when the booking was
    /// already rated.
    pub async fn set_booking_rating(
        &self,
        id: Uuid,
        rating: i16,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET client_rating = $2, updated_at = $3
            WHERE id = $1 AND client_rating IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(booking)
    }

    // ----- financial rules -----

    pub async fn get_rule_for_category(
        &self,
        category: &str,
    ) -> Result<Option<FinancialRule>, AppError> {
        let rule =
            sqlx::query_as::<_, FinancialRule>("SELECT * FROM financial_rules WHERE category = $1")
                .bind(category)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(rule)
    }

    pub async fn list_rules(&self) -> Result<Vec<FinancialRule>, AppError> {
        let rules =
            sqlx::query_as::<_, FinancialRule>("SELECT * FROM financial_rules ORDER BY category")
                .fetch_all(self.pool.as_ref())
                .await?;

        Ok(rules)
    }

    pub async fn upsert_rule(
        &self,
        category: &str,
        provider_payment: Decimal,
    ) -> Result<FinancialRule, AppError> {
        let rule = sqlx::query_as::<_, FinancialRule>(
            r#"
            INSERT INTO financial_rules (id, category, provider_payment, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (category)
            DO UPDATE SET provider_payment = EXCLUDED.provider_payment, updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category)
        .bind(provider_payment)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(rule)
    }

    // ----- financial transactions -----

    pub async fn create_transaction(
        &self,
        tx: &FinancialTransaction,
    ) -> Result<FinancialTransaction, AppError> {
        let tx = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            INSERT INTO financial_transactions (id, booking_id, client_id, provider_id, amount,
                                                provider_payout, platform_fee, gateway_ref, status,
                                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(tx.id)
        .bind(tx.booking_id)
        .bind(tx.client_id)
        .bind(tx.provider_id)
        .bind(tx.amount)
        .bind(tx.provider_payout)
        .bind(tx.platform_fee)
        .bind(&tx.gateway_ref)
        .bind(&tx.status)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(tx)
    }

    pub async fn get_transaction_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<FinancialTransaction>, AppError> {
        let tx = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            SELECT * FROM financial_transactions
            WHERE booking_id = $1 AND status <> 'failed'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(tx)
    }

    pub async fn list_transactions(&self, limit: i64) -> Result<Vec<FinancialTransaction>, AppError> {
        let txs = sqlx::query_as::<_, FinancialTransaction>(
            "SELECT * FROM financial_transactions ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(txs)
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<Option<FinancialTransaction>, AppError> {
        let tx = sqlx::query_as::<_, FinancialTransaction>(
            "SELECT * FROM financial_transactions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(tx)
    }

    pub async fn mark_transaction(
        &self,
        id: Uuid,
        status: &str,
        gateway_ref: Option<&str>,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<FinancialTransaction, AppError> {
        let tx = sqlx::query_as::<_, FinancialTransaction>(
            r#"
            UPDATE financial_transactions
            SET status = $2, gateway_ref = COALESCE($3, gateway_ref),
                paid_at = COALESCE($4, paid_at), updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(gateway_ref)
        .bind(paid_at)
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(tx)
    }

    pub async fn list_transactions_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<FinancialTransaction>, AppError> {
        let txs = sqlx::query_as::<_, FinancialTransaction>(
            "SELECT * FROM financial_transactions WHERE client_id = $1 ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(txs)
    }

    pub async fn list_transactions_for_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<FinancialTransaction>, AppError> {
        let txs = sqlx::query_as::<_, FinancialTransaction>(
            "SELECT * FROM financial_transactions WHERE provider_id = $1 ORDER BY created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(txs)
    }

    // ----- audit log -----

    pub async fn record_audit(
        &self,
        actor_id: Uuid,
        action: &str,
        detail: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_log (id, actor_id, action, detail, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(actor_id)
        .bind(action)
        .bind(detail)
        .bind(Utc::now())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    pub async fn list_audit(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(entries)
    }
}
