//! services/api/src/web/sessions.rs
//!
//! Session-ledger endpoints: both parties list their sessions, the tutor
//! completes one and logs hours, and either side reads their aggregates.

use axum::{
    extract::State,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::notifier::Notification;
use crate::web::middleware::{current_user, require_approved_tutor, require_student, AuthUser};
use crate::web::rest::SessionResponse;
use crate::web::state::AppState;
use tutoring_core::domain::Role;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionBody {
    pub session_id: Uuid,
    pub hours_spent: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionListResponse {
    pub success: bool,
    pub sessions: Vec<SessionResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionCompletedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TutorStatsBody {
    pub sessions_completed: i64,
    /// Formatted to one decimal place.
    pub total_hours: String,
    pub rating: f64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatsBody {
    pub requests_made: i64,
    pub sessions_completed: i64,
    /// Formatted to one decimal place.
    pub hours_learned: String,
}

#[derive(Serialize, ToSchema)]
#[serde(untagged)]
pub enum StatsBody {
    Tutor(TutorStatsBody),
    Student(StudentStatsBody),
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsBody,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/tutor/sessions - All of the tutor's sessions, any status; the
/// client filters by status and time as needed.
#[utoipa::path(
    get,
    path = "/api/tutor/sessions",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The tutor's sessions", body = SessionListResponse),
        (status = 403, description = "Caller is not an approved tutor")
    )
)]
pub async fn tutor_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let tutor = current_user(&state, &auth).await?;
    require_approved_tutor(&tutor)?;

    let sessions = state.db.list_sessions_for_tutor(tutor.id).await?;

    Ok(Json(SessionListResponse {
        success: true,
        sessions: sessions.iter().map(SessionResponse::from).collect(),
    }))
}

/// GET /api/tutor/student-sessions - Symmetric listing for the student.
#[utoipa::path(
    get,
    path = "/api/tutor/student-sessions",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The student's sessions", body = SessionListResponse),
        (status = 403, description = "Caller is not a student")
    )
)]
pub async fn student_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let student = current_user(&state, &auth).await?;
    require_student(&student)?;

    let sessions = state.db.list_sessions_for_student(student.id).await?;

    Ok(Json(SessionListResponse {
        success: true,
        sessions: sessions.iter().map(SessionResponse::from).collect(),
    }))
}

/// POST /api/tutor/complete-session - The owning tutor marks a session done
/// and logs hours. A second call fails with 409 and never double-counts.
#[utoipa::path(
    post,
    path = "/api/tutor/complete-session",
    request_body = CompleteSessionBody,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Session completed", body = SessionCompletedResponse),
        (status = 400, description = "Invalid hours"),
        (status = 403, description = "Caller does not own the session"),
        (status = 404, description = "No such session"),
        (status = 409, description = "Session already completed")
    )
)]
pub async fn complete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CompleteSessionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let tutor = current_user(&state, &auth).await?;
    require_approved_tutor(&tutor)?;

    let hours_spent = body.hours_spent.unwrap_or(1.0);
    if !hours_spent.is_finite() || hours_spent <= 0.0 || hours_spent > 24.0 {
        return Err(ApiError::Validation("hoursSpent must be between 0 and 24".to_string()));
    }

    let session = state
        .db
        .complete_session(body.session_id, tutor.id, hours_spent)
        .await?;

    // Admin hears about the completion with both parties' running totals.
    let student = state.db.get_user_by_id(session.student_id).await?;
    let tutor_stats = state.db.tutor_stats(tutor.id).await?;
    let student_stats = state.db.student_stats(student.id).await?;
    state.notifier.notify(Notification::SessionCompleted {
        tutor,
        student,
        session,
        tutor_total_hours: tutor_stats.total_hours,
        student_total_hours: student_stats.hours_learned,
    });

    Ok(Json(SessionCompletedResponse {
        success: true,
        message: "Session completed".to_string(),
    }))
}

/// GET /api/tutor/stats - Role-appropriate aggregates for the caller.
#[utoipa::path(
    get,
    path = "/api/tutor/stats",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Aggregates for the caller's role", body = StatsResponse)
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &auth).await?;

    let stats = match user.role {
        Role::Tutor => {
            let stats = state.db.tutor_stats(user.id).await?;
            StatsBody::Tutor(TutorStatsBody {
                sessions_completed: stats.sessions_completed,
                total_hours: format!("{:.1}", stats.total_hours),
                rating: stats.rating,
            })
        }
        _ => {
            let stats = state.db.student_stats(user.id).await?;
            StatsBody::Student(StudentStatsBody {
                requests_made: stats.requests_made,
                sessions_completed: stats.sessions_completed,
                hours_learned: format!("{:.1}", stats.hours_learned),
            })
        }
    };

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
