//! services/api/src/web/middleware.rs
//!
//! Authentication middleware and the role guards handlers build on.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use crate::web::token;
use tutoring_core::domain::{Role, User};
use tutoring_core::ports::PortError;

/// The authenticated identity extracted from a bearer token, inserted into
/// request extensions for handlers to use.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Middleware that validates the `Authorization: Bearer <token>` header.
///
/// If valid, inserts an `AuthUser` into request extensions. If invalid or
/// missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Auth("No token provided".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Auth("No token provided".to_string()))?;

    let claims = token::decode_token(state.config.jwt_secret.as_bytes(), token)
        .map_err(|_| ApiError::Auth("Invalid token".to_string()))?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(req).await)
}

/// Loads the caller's full user record. A token for a vanished account is
/// treated as an auth failure, not a 404.
pub async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    state
        .db
        .get_user_by_id(auth.user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::Auth("Unknown account".to_string()),
            other => other.into(),
        })
}

pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}

pub fn require_student(user: &User) -> Result<(), ApiError> {
    if user.role == Role::Student {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only students can do this".to_string()))
    }
}

/// Tutors must hold both the role and an approved application.
pub fn require_approved_tutor(user: &User) -> Result<(), ApiError> {
    if user.is_approved_tutor() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only approved tutors can do this".to_string()))
    }
}
