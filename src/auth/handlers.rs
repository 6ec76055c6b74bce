use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::db::models::{Role, User};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Pulls the bearer token from the request, resolves it to a user and
/// applies the caller's rate-limit tier. Every protected handler goes
/// through here first.
pub async fn authenticate_request(req: &HttpRequest, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(req)?;
    let user = state.auth_service.validate_token(token).await?;

    if !state
        .rate_limiter
        .check_rate_limit(user.id, &user.rate_limit_tier)
        .await
    {
        return Err(AuthError::RateLimited.into());
    }

    Ok(user)
}

pub fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::InvalidToken.into())
}

pub fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role() == Some(role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden.into())
    }
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return Err(AppError::ValidationError("invalid email address".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::ValidationError(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// `client` or `provider`; admins are provisioned out of band.
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", req.email);

    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let role = req.role.unwrap_or(Role::Client);
    if role == Role::Admin {
        return Err(AppError::ValidationError(
            "cannot self-register as admin".to_string(),
        ));
    }

    state
        .auth_service
        .register(&req.email, &req.password, req.display_name.as_deref(), role)
        .await?;

    // Log the new account in immediately so the front-end gets a token back
    match state.auth_service.authenticate(&req.email, &req.password).await {
        Ok(token) => {
            info!("Registration successful for email: {}", req.email);
            Ok(HttpResponse::Created().json(AuthResponse { token }))
        }
        Err(e) => {
            error!("Post-registration login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);
    match state.auth_service.authenticate(&req.email, &req.password).await {
        Ok(token) => {
            info!("Login successful for email: {}", req.email);
            Ok(HttpResponse::Ok().json(AuthResponse { token }))
        }
        Err(e) => {
            error!("Login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)?;
    state.auth_service.invalidate_token(token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("client@example.com").is_ok());
        assert!(validate_email(" padded@example.com ").is_ok());
        assert!(validate_email("no-at-sign.example.com").is_err());
        assert!(validate_email("no-dot@example").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }
}
