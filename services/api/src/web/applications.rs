//! services/api/src/web/applications.rs
//!
//! Tutor-onboarding endpoints: apply, approve, deny, and the admin's pending
//! list. Admin access is a role check on the caller's record, never an
//! identity-string comparison.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::notifier::Notification;
use crate::web::middleware::{current_user, require_admin, AuthUser};
use crate::web::rest::{ApplicationResponse, TutorSummaryResponse, UserResponse};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTutorRequest {
    #[serde(default)]
    pub subjects: Vec<String>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub motivation: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DenyTutorRequest {
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationSubmittedResponse {
    pub success: bool,
    pub message: String,
    pub application: ApplicationResponse,
}

#[derive(Serialize, ToSchema)]
pub struct DecisionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct PendingApplicationsResponse {
    pub success: bool,
    pub applications: Vec<UserResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct AvailableTutorsResponse {
    pub success: bool,
    pub tutors: Vec<TutorSummaryResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationStatusResponse {
    pub success: bool,
    pub status: String,
    pub application: ApplicationResponse,
    #[serde(rename = "userType")]
    pub user_type: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/tutor/apply-tutor - Apply (or re-apply after denial) to tutor.
#[utoipa::path(
    post,
    path = "/api/tutor/apply-tutor",
    request_body = ApplyTutorRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Application submitted", body = ApplicationSubmittedResponse),
        (status = 400, description = "No subjects given"),
        (status = 409, description = "Already pending or already approved")
    )
)]
pub async fn apply_tutor_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ApplyTutorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.subjects.iter().all(|s| s.trim().is_empty()) {
        return Err(ApiError::Validation("At least one subject required".to_string()));
    }

    let bio = match (req.experience, req.motivation) {
        (Some(e), Some(m)) => Some(format!("{e}\n{m}")),
        (e, m) => e.or(m),
    };

    let user = state
        .db
        .submit_application(
            auth.user_id,
            tutoring_core::domain::TutorProfile {
                subjects: req.subjects,
                bio,
                availability: req.availability,
            },
        )
        .await?;

    state.notifier.notify(Notification::TutorApplied {
        applicant: user.clone(),
    });

    Ok(Json(ApplicationSubmittedResponse {
        success: true,
        message: "Application submitted! Admin will review shortly.".to_string(),
        application: ApplicationResponse::from(&user),
    }))
}

/// POST /api/tutor/approve-tutor/{user_id} - Admin approval; flips the role.
#[utoipa::path(
    post,
    path = "/api/tutor/approve-tutor/{user_id}",
    params(("user_id" = Uuid, Path, description = "The applicant's user id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Tutor approved", body = DecisionResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Application is not pending")
    )
)]
pub async fn approve_tutor_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = current_user(&state, &auth).await?;
    require_admin(&caller)?;

    let user = state.db.approve_application(user_id).await?;

    state
        .notifier
        .notify(Notification::ApplicationApproved { user });

    Ok(Json(DecisionResponse {
        success: true,
        message: "Tutor approved".to_string(),
    }))
}

/// POST /api/tutor/deny-tutor/{user_id} - Admin denial with an optional
/// reason. The applicant stays a student and may re-apply.
#[utoipa::path(
    post,
    path = "/api/tutor/deny-tutor/{user_id}",
    params(("user_id" = Uuid, Path, description = "The applicant's user id")),
    request_body = DenyTutorRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Application denied", body = DecisionResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Application is not pending")
    )
)]
pub async fn deny_tutor_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<DenyTutorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = current_user(&state, &auth).await?;
    require_admin(&caller)?;

    let user = state
        .db
        .deny_application(user_id, req.reason.as_deref())
        .await?;

    state.notifier.notify(Notification::ApplicationDenied {
        user,
        reason: req.reason,
    });

    Ok(Json(DecisionResponse {
        success: true,
        message: "Application denied".to_string(),
    }))
}

/// GET /api/tutor/pending-applications - Admin list of pending applicants.
#[utoipa::path(
    get,
    path = "/api/tutor/pending-applications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Pending applications", body = PendingApplicationsResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn pending_applications_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = current_user(&state, &auth).await?;
    require_admin(&caller)?;

    let pending = state.db.list_pending_applications().await?;

    Ok(Json(PendingApplicationsResponse {
        success: true,
        applications: pending.iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/tutor/application-status - The caller's own application state,
/// backing the applicant's pending page.
#[utoipa::path(
    get,
    path = "/api/tutor/application-status",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Application status", body = ApplicationStatusResponse)
    )
)]
pub async fn application_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &auth).await?;

    Ok(Json(ApplicationStatusResponse {
        success: true,
        status: user.application.status.as_str().to_string(),
        application: ApplicationResponse::from(&user),
        user_type: user.role.as_str().to_string(),
    }))
}

/// GET /api/tutor/available-tutors - The browse page of approved tutors,
/// open to any signed-in user.
#[utoipa::path(
    get,
    path = "/api/tutor/available-tutors",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Approved tutors with their profiles", body = AvailableTutorsResponse)
    )
)]
pub async fn available_tutors_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let tutors = state.db.list_approved_tutors().await?;

    Ok(Json(AvailableTutorsResponse {
        success: true,
        tutors: tutors.iter().map(TutorSummaryResponse::from).collect(),
    }))
}
