use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{authenticate_request, require_role};
use crate::db::models::{
    BookingStatus, FinancialTransaction, Role, TransactionStatus,
};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::payments::client::CaptureRequest;
use crate::AppState;

/// Splits a booking's gross price into the category's fixed provider payout
/// and the platform's remainder.
pub fn compute_split(price: Decimal, provider_payment: Decimal) -> Result<(Decimal, Decimal), AppError> {
    if provider_payment > price {
        return Err(AppError::ValidationError(
            "provider payment exceeds booking price".to_string(),
        ));
    }
    Ok((provider_payment, price - provider_payment))
}

#[derive(Debug, Deserialize)]
pub struct CapturePaymentRequest {
    pub booking_id: Uuid,
}

/// Captures the client's payment for a completed booking: rule lookup, fee
/// split, gateway call, transaction row. A gateway failure marks the
/// transaction `failed` and surfaces the gateway's error.
pub async fn capture_payment(
    req: HttpRequest,
    body: web::Json<CapturePaymentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let booking = state
        .db
        .get_booking(body.booking_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if booking.client_id != user.id && user.role() != Some(Role::Admin) {
        return Err(AuthError::Forbidden.into());
    }

    let status = BookingStatus::parse(&booking.status)
        .ok_or_else(|| AppError::InternalError(format!("unknown booking status: {}", booking.status)))?;
    if status != BookingStatus::Completed {
        return Err(AppError::Conflict(
            "only completed bookings can be captured".to_string(),
        ));
    }

    if state
        .db
        .get_transaction_for_booking(booking.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "booking already has a payment transaction".to_string(),
        ));
    }

    let rule = state
        .db
        .get_rule_for_category(&booking.category)
        .await?
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "no financial rule configured for category {}",
                booking.category
            ))
        })?;

    let (payout, fee) = compute_split(booking.price, rule.provider_payment)?;

    let tx = FinancialTransaction::new(
        booking.id,
        booking.client_id,
        booking.provider_id,
        booking.price,
        payout,
        fee,
    );
    let tx = state.db.create_transaction(&tx).await?;

    let capture = CaptureRequest {
        amount: booking.price,
        currency: state.config.payments.currency.clone(),
        reference: booking.id,
        description: format!("HomeLink booking {} ({})", booking.id, booking.category),
    };

    match state.payments.capture(&capture).await {
        Ok(charge) => {
            let tx = state
                .db
                .mark_transaction(
                    tx.id,
                    TransactionStatus::Paid.as_str(),
                    Some(&charge.id),
                    Some(Utc::now()),
                )
                .await?;

            info!(
                transaction_id = %tx.id,
                booking_id = %booking.id,
                gateway_ref = %charge.id,
                "Payment captured"
            );

            if let Some(mailer) = &state.mailer {
                if let Ok(Some(client)) = state.db.get_user_by_id(booking.client_id).await {
                    if let Err(e) = mailer
                        .payment_receipt(&client.email, &booking.category, booking.price)
                        .await
                    {
                        warn!("Failed to send payment receipt email: {}", e);
                    }
                }
            }

            Ok(HttpResponse::Ok().json(tx))
        }
        Err(e) => {
            error!(transaction_id = %tx.id, "Gateway capture failed: {}", e);
            state
                .db
                .mark_transaction(tx.id, TransactionStatus::Failed.as_str(), None, None)
                .await?;
            Err(e.into())
        }
    }
}

/// Admin refund of a paid transaction via the gateway.
pub async fn refund_payment(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let tx_id = path.into_inner();
    let tx = state
        .db
        .get_transaction(tx_id)
        .await?
        .ok_or(DatabaseError::NotFound)?;

    if TransactionStatus::parse(&tx.status) != Some(TransactionStatus::Paid) {
        return Err(AppError::Conflict(
            "only paid transactions can be refunded".to_string(),
        ));
    }

    let gateway_ref = tx.gateway_ref.as_deref().ok_or_else(|| {
        AppError::InternalError("transaction is missing its gateway reference".to_string())
    })?;

    state.payments.refund(gateway_ref).await?;

    let tx = state
        .db
        .mark_transaction(tx.id, TransactionStatus::Refunded.as_str(), None, None)
        .await?;

    state
        .db
        .record_audit(
            user.id,
            "payment.refund",
            &format!("refunded transaction {} (gateway {})", tx.id, gateway_ref),
        )
        .await?;

    info!(transaction_id = %tx.id, "Payment refunded");
    Ok(HttpResponse::Ok().json(tx))
}

/// The caller's transactions: clients see their payments, providers their
/// payouts, admins the whole ledger.
pub async fn list_payments(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;

    let txs = match user.role() {
        Some(Role::Admin) => state.db.list_transactions(100).await?,
        Some(Role::Provider) => {
            let provider = state
                .db
                .get_provider_by_user(user.id)
                .await?
                .ok_or(AuthError::Forbidden)?;
            state.db.list_transactions_for_provider(provider.id).await?
        }
        _ => state.db.list_transactions_for_client(user.id).await?,
    };

    Ok(HttpResponse::Ok().json(txs))
}

#[derive(Debug, Deserialize)]
pub struct UpsertRuleRequest {
    pub category: String,
    pub provider_payment: Decimal,
}

pub async fn list_rules(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let rules = state.db.list_rules().await?;
    Ok(HttpResponse::Ok().json(rules))
}

pub async fn upsert_rule(
    req: HttpRequest,
    body: web::Json<UpsertRuleRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let category = body.category.trim();
    if category.is_empty() {
        return Err(AppError::ValidationError("category is required".to_string()));
    }
    if body.provider_payment <= Decimal::ZERO {
        return Err(AppError::ValidationError(
            "provider payment must be positive".to_string(),
        ));
    }

    let rule = state.db.upsert_rule(category, body.provider_payment).await?;

    state
        .db
        .record_audit(
            user.id,
            "financial_rule.upsert",
            &format!(
                "set provider payment for {} to {}",
                rule.category, rule.provider_payment
            ),
        )
        .await?;

    Ok(HttpResponse::Ok().json(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_compute_split() {
        let (payout, fee) = compute_split(dec!(120.00), dec!(90.00)).unwrap();
        assert_eq!(payout, dec!(90.00));
        assert_eq!(fee, dec!(30.00));

        // Payout and fee always reassemble the gross amount
        assert_eq!(payout + fee, dec!(120.00));
    }

    #[test]
    fn test_compute_split_rejects_oversized_payout() {
        assert!(compute_split(dec!(50.00), dec!(80.00)).is_err());
        // An exact match leaves the platform with nothing, which is allowed
        let (payout, fee) = compute_split(dec!(50.00), dec!(50.00)).unwrap();
        assert_eq!(payout, dec!(50.00));
        assert_eq!(fee, dec!(0.00));
    }
}
