//! Admin-only views over the audit log.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{authenticate_request, require_role};
use crate::db::models::Role;
use crate::error::AppError;
use crate::AppState;

const DEFAULT_AUDIT_LIMIT: i64 = 50;
const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// Recent audit rows, newest first. Every admin-facing mutation writes one.
pub async fn list_audit(
    req: HttpRequest,
    query: web::Query<AuditQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate_request(&req, &state).await?;
    require_role(&user, Role::Admin)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entries = state.db.list_audit(limit).await?;

    Ok(HttpResponse::Ok().json(entries))
}
